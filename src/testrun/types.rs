//! Test-run data model: the step catalog, per-step and per-run status, and
//! the capped audit log.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Log entries kept before the oldest are dropped.
pub const LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl TestStatus {
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

/// The fixed, ordered step catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepName {
    #[serde(rename = "Initialize Preview")]
    InitializePreview,
    #[serde(rename = "Parse HTML Structure")]
    ParseHtmlStructure,
    #[serde(rename = "Load CSS Styles")]
    LoadCssStyles,
    #[serde(rename = "Execute JavaScript")]
    ExecuteJavaScript,
    #[serde(rename = "Capture Console Output")]
    CaptureConsoleOutput,
    #[serde(rename = "Render Complete")]
    RenderComplete,
}

impl StepName {
    pub const CATALOG: [Self; 6] = [
        Self::InitializePreview,
        Self::ParseHtmlStructure,
        Self::LoadCssStyles,
        Self::ExecuteJavaScript,
        Self::CaptureConsoleOutput,
        Self::RenderComplete,
    ];

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::InitializePreview => "Initialize Preview",
            Self::ParseHtmlStructure => "Parse HTML Structure",
            Self::LoadCssStyles => "Load CSS Styles",
            Self::ExecuteJavaScript => "Execute JavaScript",
            Self::CaptureConsoleOutput => "Capture Console Output",
            Self::RenderComplete => "Render Complete",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStep {
    pub id: String,
    pub name: StepName,
    pub status: TestStatus,
    #[serde(rename = "timestamp", with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    #[serde(rename = "duration", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TestStep {
    fn pending(name: StepName) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            status: TestStatus::Pending,
            started_at: None,
            duration_ms: None,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub steps: Vec<TestStep>,
    pub status: RunStatus,
}

impl TestRun {
    /// A running run with every catalog step pending.
    #[must_use]
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            start_time: OffsetDateTime::now_utc(),
            end_time: None,
            steps: StepName::CATALOG.into_iter().map(TestStep::pending).collect(),
            status: RunStatus::Running,
        }
    }

    #[must_use]
    pub fn has_failures(&self) -> bool {
        self.steps.iter().any(|s| s.status == TestStatus::Failed)
    }

    /// Stamp the end time and settle the run status. A cancelled run is
    /// always failed.
    pub fn finish(&mut self, cancelled: bool) {
        self.end_time = Some(OffsetDateTime::now_utc());
        self.status = if cancelled || self.has_failures() { RunStatus::Failed } else { RunStatus::Completed };
    }
}

// =============================================================================
// LOG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub step: String,
    pub status: TestStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Append-only audit trail, capped at [`LOG_CAPACITY`].
#[derive(Debug, Clone, Default)]
pub struct RunLog {
    entries: Vec<LogEntry>,
}

impl RunLog {
    pub fn push(&mut self, step: &str, status: TestStatus, message: Option<String>) {
        self.entries.push(LogEntry {
            id: Uuid::new_v4().to_string(),
            step: step.to_owned(),
            status,
            timestamp: OffsetDateTime::now_utc(),
            message,
        });
        if self.entries.len() > LOG_CAPACITY {
            let excess = self.entries.len() - LOG_CAPACITY;
            self.entries.drain(..excess);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
