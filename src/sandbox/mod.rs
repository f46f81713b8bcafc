//! Sandboxed execution channel: render a document in isolation and collect
//! what it reports back.
//!
//! DESIGN
//! ======
//! The isolated context is abstracted behind [`SandboxFrame`]; the host
//! only ever hands it a complete, instrumented document, so every render
//! fully replaces the previous content. Messages travel the other way as
//! raw JSON and are decoded into [`SandboxMessage`]. Anything that does not
//! decode is dropped at debug level.
//!
//! A render is keyed by `(document, run)`. Bumping the run counter forces a
//! fresh render of identical content; repeating the same key is a no-op, so
//! a failed render is only retried once the document or the run changes.

pub mod instrument;
pub mod message;

use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::ErrorCode;
pub use message::{ConsoleEntry, ConsoleKind, ConsoleLog, SandboxMessage};

/// Capabilities granted to the isolated frame: scripts and dialogs, no
/// same-origin access, no top-level navigation.
pub const SANDBOX_PERMISSIONS: &str = "allow-scripts allow-modals";

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("preview frame is not attached")]
    Detached,

    #[error("Failed to render preview: {0}")]
    Render(String),
}

impl ErrorCode for SandboxError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Detached => "E_SANDBOX_DETACHED",
            Self::Render(_) => "E_SANDBOX_RENDER",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Detached)
    }
}

/// Handle to the isolated rendering context.
pub trait SandboxFrame {
    /// Replace the frame's entire content with `document`.
    ///
    /// # Errors
    ///
    /// Returns a [`SandboxError`] if the frame's document is unavailable.
    fn load(&mut self, document: &str) -> Result<(), SandboxError>;
}

// =============================================================================
// SRCDOC FRAME
// =============================================================================

/// Renders documents as a sandboxed `<iframe srcdoc>` element.
#[derive(Debug, Clone)]
pub struct SrcdocFrame {
    markup: Option<String>,
    attached: bool,
}

impl SrcdocFrame {
    #[must_use]
    pub fn new() -> Self {
        Self { markup: None, attached: true }
    }

    #[must_use]
    pub fn detached() -> Self {
        Self { markup: None, attached: false }
    }

    pub fn set_attached(&mut self, attached: bool) {
        self.attached = attached;
    }

    /// The `<iframe>` element for the last loaded document.
    #[must_use]
    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }
}

impl Default for SrcdocFrame {
    fn default() -> Self {
        Self::new()
    }
}

impl SandboxFrame for SrcdocFrame {
    fn load(&mut self, document: &str) -> Result<(), SandboxError> {
        if !self.attached {
            return Err(SandboxError::Detached);
        }
        self.markup = Some(format!(
            "<iframe sandbox=\"{SANDBOX_PERMISSIONS}\" title=\"Code Preview\" srcdoc=\"{}\"></iframe>",
            escape_attribute(document)
        ));
        Ok(())
    }
}

fn escape_attribute(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

// =============================================================================
// EXECUTION CHANNEL
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    /// Nothing to show.
    Idle,
    Rendered,
    /// Terminal until the document or run counter changes.
    Failed(String),
}

type CompleteCallback = Box<dyn FnMut() + Send>;
type ErrorCallback = Box<dyn FnMut(&str) + Send>;

pub struct ExecutionChannel<F: SandboxFrame> {
    frame: F,
    console: ConsoleLog,
    state: RenderState,
    last_key: Option<(String, u64)>,
    on_render_complete: Option<CompleteCallback>,
    on_error: Option<ErrorCallback>,
}

impl<F: SandboxFrame> ExecutionChannel<F> {
    #[must_use]
    pub fn new(frame: F) -> Self {
        Self {
            frame,
            console: ConsoleLog::new(),
            state: RenderState::Idle,
            last_key: None,
            on_render_complete: None,
            on_error: None,
        }
    }

    /// Called for every `renderComplete` message.
    pub fn on_render_complete(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_render_complete = Some(Box::new(callback));
    }

    /// Called with the human-readable reason when a render fails.
    pub fn on_error(&mut self, callback: impl FnMut(&str) + Send + 'static) {
        self.on_error = Some(Box::new(callback));
    }

    /// Instrument and load `document`. Never fails: a render error becomes
    /// [`RenderState::Failed`] and is reported to the error callback.
    pub fn render(&mut self, document: &str, run: u64) -> &RenderState {
        if self
            .last_key
            .as_ref()
            .is_some_and(|(doc, last_run)| *last_run == run && doc == document)
        {
            return &self.state;
        }
        self.last_key = Some((document.to_owned(), run));

        if document.is_empty() {
            self.state = RenderState::Idle;
            return &self.state;
        }

        let instrumented = instrument::instrument(document);
        match self.frame.load(&instrumented) {
            Ok(()) => {
                info!(run, bytes = document.len(), "sandbox: rendered");
                self.state = RenderState::Rendered;
            }
            Err(e) => {
                warn!(run, error = %e, code = e.error_code(), "sandbox: render failed");
                let reason = e.to_string();
                if let Some(callback) = self.on_error.as_mut() {
                    callback(&reason);
                }
                self.state = RenderState::Failed(reason);
            }
        }
        &self.state
    }

    /// Apply one inbound payload. Returns the decoded message, or `None` for
    /// shapes the channel does not understand.
    pub fn handle_message(&mut self, raw: &Value) -> Option<SandboxMessage> {
        let Some(message) = SandboxMessage::parse(raw) else {
            debug!(payload = %raw, "sandbox: ignoring unrecognized message");
            return None;
        };
        match &message {
            SandboxMessage::Console { kind, message } => {
                self.console.push(*kind, message.clone());
            }
            SandboxMessage::RenderComplete => {
                if let Some(callback) = self.on_render_complete.as_mut() {
                    callback();
                }
            }
        }
        Some(message)
    }

    /// Drain `rx` until every sender is dropped.
    pub async fn listen(&mut self, rx: &mut mpsc::Receiver<Value>) {
        while let Some(raw) = rx.recv().await {
            self.handle_message(&raw);
        }
    }

    #[must_use]
    pub fn console(&self) -> &[ConsoleEntry] {
        self.console.entries()
    }

    pub fn clear_console(&mut self) {
        self.console.clear();
    }

    #[must_use]
    pub fn state(&self) -> &RenderState {
        &self.state
    }

    #[must_use]
    pub fn frame(&self) -> &F {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut F {
        &mut self.frame
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
