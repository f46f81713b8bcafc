//! Step execution: the per-step checks behind an injectable seam.

use std::time::Duration;

use rand::Rng;

use super::config::TestRunConfig;
use super::markup::check_structure;
use super::types::StepName;
use crate::compose::find_ci;
use crate::error::ErrorCode;

#[derive(Debug, thiserror::Error)]
pub enum StepError {
    #[error("Empty HTML content")]
    EmptyDocument,

    #[error("HTML parsing errors detected: {0}")]
    Markup(String),

    /// Raised by custom executors.
    #[error("{0}")]
    Other(String),
}

impl ErrorCode for StepError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyDocument => "E_STEP_EMPTY_DOCUMENT",
            Self::Markup(_) => "E_STEP_MARKUP",
            Self::Other(_) => "E_STEP_FAILED",
        }
    }
}

/// Runs one catalog step against a document.
#[async_trait::async_trait]
pub trait StepExecutor: Send + Sync {
    /// Returns an optional informational note on success.
    ///
    /// # Errors
    ///
    /// Returns a [`StepError`] when the step's check fails.
    async fn execute(&self, step: StepName, document: &str) -> Result<Option<String>, StepError>;
}

// =============================================================================
// HEURISTIC EXECUTOR
// =============================================================================

/// Simulated work delay followed by lightweight text checks.
#[derive(Debug, Clone, Copy)]
pub struct HeuristicExecutor {
    work_min: Duration,
    work_jitter: Duration,
}

impl HeuristicExecutor {
    #[must_use]
    pub fn new(config: &TestRunConfig) -> Self {
        Self { work_min: config.work_min, work_jitter: config.work_jitter }
    }

    fn work_delay(&self) -> Duration {
        let jitter_ms = u64::try_from(self.work_jitter.as_millis()).unwrap_or(u64::MAX);
        if jitter_ms == 0 {
            return self.work_min;
        }
        self.work_min + Duration::from_millis(rand::rng().random_range(0..=jitter_ms))
    }
}

#[async_trait::async_trait]
impl StepExecutor for HeuristicExecutor {
    async fn execute(&self, step: StepName, document: &str) -> Result<Option<String>, StepError> {
        let delay = self.work_delay();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        check_step(step, document)
    }
}

/// The check behind each catalog step.
///
/// # Errors
///
/// Only "Initialize Preview" (blank document) and "Parse HTML Structure"
/// (structural markup errors) can fail; every other step is informational.
pub fn check_step(step: StepName, document: &str) -> Result<Option<String>, StepError> {
    match step {
        StepName::InitializePreview => {
            if document.trim().is_empty() {
                return Err(StepError::EmptyDocument);
            }
            Ok(None)
        }
        StepName::ParseHtmlStructure => {
            let issues = check_structure(document);
            if issues.is_empty() {
                return Ok(None);
            }
            let detail = issues.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            Err(StepError::Markup(detail))
        }
        StepName::LoadCssStyles => {
            let has_styles = find_ci(document, "<style").is_some() || find_ci(document, "<link").is_some();
            Ok((!has_styles).then(|| "No explicit styles found, using defaults".to_owned()))
        }
        StepName::ExecuteJavaScript => {
            let has_scripts = find_ci(document, "<script").is_some();
            Ok((!has_scripts).then(|| "No scripts to execute".to_owned()))
        }
        StepName::CaptureConsoleOutput | StepName::RenderComplete => Ok(None),
    }
}

#[cfg(test)]
#[path = "steps_test.rs"]
mod tests;
