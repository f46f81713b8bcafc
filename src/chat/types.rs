//! Chat message types and the conversation history.
//!
//! DESIGN
//! ======
//! History is an ordered list of immutable messages. While a reply streams,
//! an owned [`AssistantDraft`] accumulates text; after each fragment it
//! produces a fresh [`Message`] snapshot that [`Conversation::upsert_assistant`]
//! swaps into the last slot. Nothing mutates a message in place.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::blocks::{CodeBlock, extract_code_blocks};
use crate::error::ErrorCode;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced while talking to the chat endpoint.
///
/// Display text is the reason shown to the user in the synthetic error reply.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// A required configuration variable is not set.
    #[error("missing config: env var {var} not set")]
    MissingConfig { var: String },

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// The request never produced a response (network, DNS, timeout).
    #[error("request failed: {0}")]
    Request(String),

    /// The endpoint answered with a non-success status.
    #[error("{reason}")]
    Api { status: u16, reason: String },

    /// The response arrived without a readable body.
    #[error("No response body")]
    MissingBody,

    /// Reading the event stream failed part-way.
    #[error("stream read failed: {0}")]
    Stream(String),
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingConfig { .. } => "E_MISSING_CONFIG",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Request(_) => "E_CHAT_REQUEST",
            Self::Api { .. } => "E_CHAT_RESPONSE",
            Self::MissingBody => "E_CHAT_NO_BODY",
            Self::Stream(_) => "E_CHAT_STREAM",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Stream(_) | Self::Api { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// MESSAGES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One chat turn. Code blocks are only populated for assistant messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_blocks: Vec<CodeBlock>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
            code_blocks: Vec::new(),
        }
    }

    /// Synthetic assistant turn reporting a failed request.
    #[must_use]
    pub fn assistant_error(reason: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: format!("Sorry, I encountered an error: {reason}. Please try again."),
            timestamp: OffsetDateTime::now_utc(),
            code_blocks: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// `{role, content}` pair sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: Role,
    pub content: String,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self { role: message.role, content: message.content.clone() }
    }
}

// =============================================================================
// ASSISTANT DRAFT
// =============================================================================

/// Owned builder for the assistant reply currently streaming in.
///
/// Id and timestamp are fixed when the draft starts, so every snapshot of
/// one reply refers to the same message.
#[derive(Debug)]
pub struct AssistantDraft {
    id: String,
    timestamp: OffsetDateTime,
    content: String,
}

impl AssistantDraft {
    #[must_use]
    pub fn new() -> Self {
        Self { id: Uuid::new_v4().to_string(), timestamp: OffsetDateTime::now_utc(), content: String::new() }
    }

    /// Append a fragment and return a snapshot with code blocks re-extracted
    /// from the whole accumulated text.
    pub fn push(&mut self, fragment: &str) -> Message {
        self.content.push_str(fragment);
        self.snapshot()
    }

    #[must_use]
    pub fn snapshot(&self) -> Message {
        Message {
            id: self.id.clone(),
            role: Role::Assistant,
            content: self.content.clone(),
            timestamp: self.timestamp,
            code_blocks: extract_code_blocks(&self.content),
        }
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }
}

impl Default for AssistantDraft {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// Ordered chat history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Replace the last message if it is an assistant turn, else append.
    pub fn upsert_assistant(&mut self, snapshot: Message) {
        match self.messages.last_mut() {
            Some(last) if last.is_assistant() => *last = snapshot,
            _ => self.messages.push(snapshot),
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn latest_assistant(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.is_assistant())
    }

    /// History in the shape the chat endpoint expects.
    #[must_use]
    pub fn wire_messages(&self) -> Vec<WireMessage> {
        self.messages.iter().map(WireMessage::from).collect()
    }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
