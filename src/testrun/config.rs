//! Test-run pacing parsed from environment variables.

use std::time::Duration;

use crate::chat::config::env_parse_u64;

pub const DEFAULT_STEP_PAUSE_MS: u64 = 50;
pub const DEFAULT_WORK_MIN_MS: u64 = 30;
pub const DEFAULT_WORK_JITTER_MS: u64 = 70;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRunConfig {
    /// Pause after every step.
    pub step_pause: Duration,
    /// Minimum simulated work per step.
    pub work_min: Duration,
    /// Upper bound of the random extra work per step.
    pub work_jitter: Duration,
}

impl Default for TestRunConfig {
    fn default() -> Self {
        Self {
            step_pause: Duration::from_millis(DEFAULT_STEP_PAUSE_MS),
            work_min: Duration::from_millis(DEFAULT_WORK_MIN_MS),
            work_jitter: Duration::from_millis(DEFAULT_WORK_JITTER_MS),
        }
    }
}

impl TestRunConfig {
    /// Optional:
    /// - `TEST_RUN_STEP_PAUSE_MS`: default 50
    /// - `TEST_RUN_WORK_MIN_MS`: default 30
    /// - `TEST_RUN_WORK_JITTER_MS`: default 70
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            step_pause: Duration::from_millis(env_parse_u64("TEST_RUN_STEP_PAUSE_MS", DEFAULT_STEP_PAUSE_MS)),
            work_min: Duration::from_millis(env_parse_u64("TEST_RUN_WORK_MIN_MS", DEFAULT_WORK_MIN_MS)),
            work_jitter: Duration::from_millis(env_parse_u64("TEST_RUN_WORK_JITTER_MS", DEFAULT_WORK_JITTER_MS)),
        }
    }

    /// No pauses and no simulated work.
    #[must_use]
    pub fn immediate() -> Self {
        Self { step_pause: Duration::ZERO, work_min: Duration::ZERO, work_jitter: Duration::ZERO }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
