//! Synthetic test run: walk a composed document through the fixed step
//! catalog with live progress.
//!
//! DESIGN
//! ======
//! `idle → running → {completed | failed}`. Steps run strictly in order and
//! a failing step never stops the run. Cancellation is cooperative: `stop`
//! raises a shared flag that the loop checks before each step, so the step
//! in flight always finishes first.
//!
//! [`TestRunner`] is a cheap handle over shared state. A host keeps one clone
//! awaiting `run` and calls `stop` or reads progress through another. Locks
//! are never held across an await.

pub mod config;
pub mod markup;
pub mod steps;
pub mod types;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use time::OffsetDateTime;
use tracing::{info, warn};

use crate::error::ErrorCode;
pub use config::TestRunConfig;
pub use steps::{HeuristicExecutor, StepError, StepExecutor};
pub use types::{LogEntry, RunStatus, StepName, TestRun, TestStatus, TestStep};
use types::RunLog;

const RUN_LOG_STEP: &str = "Test Run";
const VALIDATION_LOG_STEP: &str = "Validation";

#[derive(Default)]
struct RunnerState {
    current: Option<TestRun>,
    logs: RunLog,
    running: bool,
}

#[derive(Clone)]
pub struct TestRunner {
    state: Arc<Mutex<RunnerState>>,
    abort: Arc<AtomicBool>,
    executor: Arc<dyn StepExecutor>,
    config: TestRunConfig,
}

impl TestRunner {
    #[must_use]
    pub fn new(executor: Arc<dyn StepExecutor>, config: TestRunConfig) -> Self {
        Self { state: Arc::default(), abort: Arc::new(AtomicBool::new(false)), executor, config }
    }

    /// Heuristic steps paced by `TEST_RUN_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let config = TestRunConfig::from_env();
        Self::new(Arc::new(HeuristicExecutor::new(&config)), config)
    }

    /// Run the full catalog against `document` and return the finished run.
    ///
    /// Returns `None` without touching the current run when the document is
    /// empty or another run is still active; both cases are logged as a
    /// failed entry instead.
    pub async fn run(&self, document: &str) -> Option<TestRun> {
        if document.is_empty() {
            self.lock().logs.push(VALIDATION_LOG_STEP, TestStatus::Failed, Some("No HTML content to test".into()));
            return None;
        }

        let run_id = {
            let mut state = self.lock();
            if state.running {
                state
                    .logs
                    .push(RUN_LOG_STEP, TestStatus::Failed, Some("A test run is already in progress".into()));
                return None;
            }
            self.abort.store(false, Ordering::SeqCst);
            let run = TestRun::start();
            let run_id = run.id.clone();
            state.current = Some(run);
            state.running = true;
            state.logs.push(RUN_LOG_STEP, TestStatus::Running, Some("Starting test run...".into()));
            run_id
        };
        info!(%run_id, bytes = document.len(), "testrun: started");

        let mut cancelled = false;
        let mut any_failed = false;
        for (index, step) in StepName::CATALOG.into_iter().enumerate() {
            if self.abort.load(Ordering::SeqCst) {
                self.lock().logs.push(RUN_LOG_STEP, TestStatus::Failed, Some("Test run aborted".into()));
                info!(%run_id, next_step = step.label(), "testrun: aborted");
                cancelled = true;
                break;
            }

            self.update_step(&run_id, index, |s| {
                s.status = TestStatus::Running;
                s.started_at = Some(OffsetDateTime::now_utc());
            });
            self.lock().logs.push(step.label(), TestStatus::Running, None);

            let started = Instant::now();
            let outcome = self.executor.execute(step, document).await;
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match outcome {
                Ok(note) => {
                    self.update_step(&run_id, index, |s| {
                        s.status = TestStatus::Completed;
                        s.duration_ms = Some(duration_ms);
                    });
                    let message = match note {
                        Some(note) => format!("Completed in {duration_ms}ms ({note})"),
                        None => format!("Completed in {duration_ms}ms"),
                    };
                    self.lock().logs.push(step.label(), TestStatus::Completed, Some(message));
                }
                Err(e) => {
                    any_failed = true;
                    warn!(%run_id, step = step.label(), error = %e, code = e.error_code(), "testrun: step failed");
                    let reason = e.to_string();
                    self.update_step(&run_id, index, |s| {
                        s.status = TestStatus::Failed;
                        s.duration_ms = Some(duration_ms);
                        s.error = Some(reason.clone());
                    });
                    self.lock().logs.push(step.label(), TestStatus::Failed, Some(reason));
                }
            }

            if !self.config.step_pause.is_zero() {
                tokio::time::sleep(self.config.step_pause).await;
            }
        }

        // A stop during the last step or the pause after it still cancels.
        cancelled |= self.abort.load(Ordering::SeqCst);

        let mut state = self.lock();
        state.running = false;
        let finished = match state.current.as_mut() {
            Some(run) if run.id == run_id => {
                run.finish(cancelled);
                Some(run.clone())
            }
            // Cleared while running.
            _ => None,
        };
        let status = if cancelled || any_failed { TestStatus::Failed } else { TestStatus::Completed };
        state.logs.push(RUN_LOG_STEP, status, Some("Test run finished".into()));
        drop(state);

        info!(%run_id, ?status, cancelled, "testrun: finished");
        finished
    }

    /// Ask the active run to stop before its next step. No-op when idle.
    pub fn stop(&self) {
        let mut state = self.lock();
        if !state.running {
            return;
        }
        self.abort.store(true, Ordering::SeqCst);
        state.logs.push(RUN_LOG_STEP, TestStatus::Failed, Some("Test run stopped by user".into()));
    }

    /// Empty the log and forget the current run.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.logs.clear();
        state.current = None;
    }

    #[must_use]
    pub fn current_run(&self) -> Option<TestRun> {
        self.lock().current.clone()
    }

    #[must_use]
    pub fn logs(&self) -> Vec<LogEntry> {
        self.lock().logs.entries().to_vec()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock().running
    }

    fn lock(&self) -> MutexGuard<'_, RunnerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update_step(&self, run_id: &str, index: usize, apply: impl FnOnce(&mut TestStep)) {
        let mut state = self.lock();
        if let Some(step) = state
            .current
            .as_mut()
            .filter(|run| run.id == run_id)
            .and_then(|run| run.steps.get_mut(index))
        {
            apply(step);
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
