//! Chat transport: POST the history, get back an event-stream body.
//!
//! The endpoint takes `{messages: [{role, content}, ...]}` and answers with a
//! `text/event-stream` body, or a JSON `{error}` object on failure.

use std::pin::Pin;
use std::time::Duration;

use futures::{Stream, StreamExt};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use super::config::ChatConfig;
use super::types::{ChatError, WireMessage};

/// Response body as a stream of raw chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Vec<u8>>> + Send>>;

const FALLBACK_REASON: &str = "Failed to get response";

/// Opens a streaming chat completion. Enables mocking in tests.
#[async_trait::async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send the conversation and return the reply body.
    ///
    /// # Errors
    ///
    /// Returns a [`ChatError`] if the request fails, the endpoint answers
    /// with a non-success status, or the response carries no body.
    async fn open(&self, messages: &[WireMessage]) -> Result<ByteStream, ChatError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: &'a [WireMessage],
}

// =============================================================================
// HTTP TRANSPORT
// =============================================================================

pub struct HttpTransport {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    /// Deadline for the response head only; the streamed body may run longer.
    request_timeout: Duration,
}

impl HttpTransport {
    /// Build a transport for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ChatError::HttpClientBuild`] if the HTTP client cannot be built.
    pub fn new(config: &ChatConfig) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| ChatError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        })
    }
}

#[async_trait::async_trait]
impl ChatTransport for HttpTransport {
    async fn open(&self, messages: &[WireMessage]) -> Result<ByteStream, ChatError> {
        let mut request = self
            .http
            .post(&self.endpoint)
            .json(&ChatRequest { messages });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = tokio::time::timeout(self.request_timeout, request.send())
            .await
            .map_err(|_| ChatError::Request(format!("no response within {}s", self.request_timeout.as_secs())))?
            .map_err(|e| ChatError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api { status: status.as_u16(), reason: error_reason(&body) });
        }
        if status == StatusCode::NO_CONTENT || status == StatusCode::RESET_CONTENT {
            return Err(ChatError::MissingBody);
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|b| b.to_vec()).map_err(std::io::Error::other));
        Ok(Box::pin(body))
    }
}

/// The `error` string of a JSON error body, else a generic reason.
pub(crate) fn error_reason(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
        .filter(|reason| !reason.is_empty())
        .unwrap_or_else(|| FALLBACK_REASON.to_owned())
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
