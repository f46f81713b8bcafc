//! Messages posted from the sandboxed document to the host, and the console
//! log they feed.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use uuid::Uuid;

/// Console entries kept before the oldest are dropped.
pub const CONSOLE_CAPACITY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleKind {
    Log,
    Error,
    Warn,
    Info,
}

impl ConsoleKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
        }
    }
}

/// An inbound `postMessage` payload, discriminated by its `type` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SandboxMessage {
    /// One forwarded console call (or uncaught error / rejection).
    Console {
        #[serde(rename = "consoleType")]
        kind: ConsoleKind,
        #[serde(default)]
        message: String,
    },

    /// The document finished loading.
    RenderComplete,
}

impl SandboxMessage {
    /// Decode a raw payload. Unknown or malformed shapes yield `None`.
    #[must_use]
    pub fn parse(raw: &Value) -> Option<Self> {
        Self::deserialize(raw).ok()
    }
}

// =============================================================================
// CONSOLE LOG
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ConsoleKind,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Insertion-ordered console output, capped at [`CONSOLE_CAPACITY`].
#[derive(Debug, Clone, Default)]
pub struct ConsoleLog {
    entries: Vec<ConsoleEntry>,
}

impl ConsoleLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, then drop the oldest beyond capacity.
    pub fn push(&mut self, kind: ConsoleKind, message: impl Into<String>) -> &ConsoleEntry {
        self.entries.push(ConsoleEntry {
            id: Uuid::new_v4().to_string(),
            kind,
            message: message.into(),
            timestamp: OffsetDateTime::now_utc(),
        });
        if self.entries.len() > CONSOLE_CAPACITY {
            let excess = self.entries.len() - CONSOLE_CAPACITY;
            self.entries.drain(..excess);
        }
        &self.entries[self.entries.len() - 1]
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn entries(&self) -> &[ConsoleEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
