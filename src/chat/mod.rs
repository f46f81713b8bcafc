//! Chat: conversation state, streamed replies, and persisted history.
//!
//! DESIGN
//! ======
//! [`ChatSession`] owns the conversation and talks to the outside world only
//! through two seams: a [`ChatTransport`] that opens the reply stream and a
//! [`KeyValueStore`] that persists history. Failures never escape
//! `send_message`; they become one synthetic assistant reply instead.

pub mod config;
pub mod history;
pub mod stream;
pub mod transport;
pub mod types;

use std::sync::Arc;

use tracing::{info, warn};

use crate::blocks::CodeBlock;
use crate::error::ErrorCode;
use config::ChatConfig;
use history::{FileStore, KeyValueStore, MemoryStore};
pub use transport::{ChatTransport, HttpTransport};
use types::{ChatError, Conversation, Message};

// =============================================================================
// SESSION
// =============================================================================

pub struct ChatSession {
    transport: Arc<dyn ChatTransport>,
    store: Arc<dyn KeyValueStore>,
    conversation: Conversation,
    loading: bool,
}

impl ChatSession {
    #[must_use]
    pub fn new(transport: Arc<dyn ChatTransport>, store: Arc<dyn KeyValueStore>) -> Self {
        Self { transport, store, conversation: Conversation::new(), loading: false }
    }

    /// Build a session from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required config is missing or the HTTP client fails.
    pub fn from_env() -> Result<Self, ChatError> {
        let config = ChatConfig::from_env()?;
        Self::from_config(&config)
    }

    /// HTTP transport plus a file-backed store when `history_dir` is set,
    /// else an in-memory one.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ChatError> {
        let transport = Arc::new(HttpTransport::new(config)?);
        let store: Arc<dyn KeyValueStore> = match &config.history_dir {
            Some(dir) => Arc::new(FileStore::new(dir.clone())),
            None => Arc::new(MemoryStore::new()),
        };
        Ok(Self::new(transport, store))
    }

    /// Replace the conversation with the persisted history. Returns the
    /// number of messages restored.
    pub fn load(&mut self) -> usize {
        self.conversation = Conversation::from_messages(history::load_history(self.store.as_ref()));
        self.conversation.len()
    }

    /// Send one user turn and stream the assistant reply into the history.
    ///
    /// Blank input is ignored. Transport and stream failures append a single
    /// synthetic assistant error message; the user's turn is always kept.
    pub async fn send_message(&mut self, content: &str) {
        if content.trim().is_empty() {
            return;
        }

        self.conversation.push(Message::user(content));
        self.persist();

        self.loading = true;
        let outcome = self.stream_reply().await;
        self.loading = false;

        match outcome {
            Ok(reply) => info!(chars = reply.len(), messages = self.conversation.len(), "chat: reply complete"),
            Err(e) => {
                warn!(error = %e, code = e.error_code(), retryable = e.retryable(), "chat: request failed");
                self.conversation.push(Message::assistant_error(&e.to_string()));
            }
        }
        self.persist();
    }

    async fn stream_reply(&mut self) -> Result<String, ChatError> {
        let wire = self.conversation.wire_messages();
        info!(messages = wire.len(), "chat: request start");
        let body = self.transport.open(&wire).await?;
        stream::aggregate_stream(body, &mut self.conversation).await
    }

    /// Drop every message and remove the persisted history.
    pub fn clear(&mut self) {
        self.conversation.clear();
        self.loading = false;
        if let Err(e) = history::clear_history(self.store.as_ref()) {
            warn!(error = %e, code = e.error_code(), "chat: clearing history failed");
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        self.conversation.messages()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Previewable blocks of the most recent assistant message.
    #[must_use]
    pub fn latest_previewable_code(&self) -> Vec<CodeBlock> {
        self.conversation
            .latest_assistant()
            .map(|m| m.code_blocks.iter().filter(|b| b.is_previewable).cloned().collect())
            .unwrap_or_default()
    }

    fn persist(&self) {
        if self.conversation.is_empty() {
            return;
        }
        if let Err(e) = history::save_history(self.store.as_ref(), self.conversation.messages()) {
            warn!(error = %e, code = e.error_code(), "chat: saving history failed");
        }
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
