//! Persisted chat history behind an injectable key/value store.
//!
//! The whole history is one JSON array under [`HISTORY_STORAGE_KEY`].
//! Timestamps round-trip as RFC 3339 strings, so a load yields real
//! `OffsetDateTime` values again.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{info, warn};

use super::types::Message;
use crate::error::ErrorCode;

pub const HISTORY_STORAGE_KEY: &str = "ai-code-chatbot-messages";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage read failed: {0}")]
    Read(String),

    #[error("storage write failed: {0}")]
    Write(String),

    #[error("stored value is corrupt: {0}")]
    Corrupt(String),
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Read(_) => "E_STORE_READ",
            Self::Write(_) => "E_STORE_WRITE",
            Self::Corrupt(_) => "E_STORE_CORRUPT",
        }
    }
}

/// String-keyed string storage, shaped like browser `localStorage`.
pub trait KeyValueStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`StoreError::Read`] if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Write`] if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

// =============================================================================
// BACKENDS
// =============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read(e.to_string())),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| StoreError::Write(e.to_string()))?;
        std::fs::write(self.path_for(key), value).map_err(|e| StoreError::Write(e.to_string()))
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Write(e.to_string())),
        }
    }
}

// =============================================================================
// HISTORY
// =============================================================================

/// Load the saved history. Missing, unreadable, or corrupt data yields an
/// empty history.
pub fn load_history(store: &dyn KeyValueStore) -> Vec<Message> {
    let raw = match store.get(HISTORY_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(e) => {
            warn!(error = %e, code = e.error_code(), "history: load failed");
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<Message>>(&raw) {
        Ok(messages) => {
            info!(count = messages.len(), "history: loaded");
            messages
        }
        Err(e) => {
            let e = StoreError::Corrupt(e.to_string());
            warn!(error = %e, code = e.error_code(), "history: discarding corrupt history");
            Vec::new()
        }
    }
}

/// # Errors
///
/// Returns a [`StoreError`] if serialization or the backend write fails.
pub fn save_history(store: &dyn KeyValueStore, messages: &[Message]) -> Result<(), StoreError> {
    let raw = serde_json::to_string(messages).map_err(|e| StoreError::Write(e.to_string()))?;
    store.set(HISTORY_STORAGE_KEY, &raw)
}

/// Remove the history key entirely.
///
/// # Errors
///
/// Returns a [`StoreError`] if the backend write fails.
pub fn clear_history(store: &dyn KeyValueStore) -> Result<(), StoreError> {
    store.remove(HISTORY_STORAGE_KEY)
}

#[cfg(test)]
#[path = "history_test.rs"]
mod tests;
