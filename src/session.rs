//! Preview session: ties code selection to the execution channel.
//!
//! Until the user picks or edits code, the preview follows the previewable
//! blocks of the latest assistant reply. After that the user's code wins
//! until `reset`.

use std::time::{Duration, Instant};

use tracing::info;

use crate::blocks::CodeBlock;
use crate::chat::types::Message;
use crate::compose::{compose_or_raw, wrap_in_document};
use crate::sandbox::{ExecutionChannel, RenderState, SandboxFrame};

#[derive(Debug, Clone)]
enum Selection {
    Empty,
    Blocks(Vec<CodeBlock>),
    Code(String),
}

pub struct PreviewSession<F: SandboxFrame> {
    channel: ExecutionChannel<F>,
    selection: Selection,
    manual: bool,
    run_count: u64,
    elapsed: Option<Duration>,
}

impl<F: SandboxFrame> PreviewSession<F> {
    #[must_use]
    pub fn new(frame: F) -> Self {
        Self {
            channel: ExecutionChannel::new(frame),
            selection: Selection::Empty,
            manual: false,
            run_count: 0,
            elapsed: None,
        }
    }

    /// Track the latest assistant reply. Returns `true` when the selection
    /// changed; always `false` once the user has chosen code.
    pub fn follow_latest(&mut self, messages: &[Message]) -> bool {
        if self.manual {
            return false;
        }
        let Some(latest) = messages.iter().rev().find(|m| m.is_assistant()) else {
            return false;
        };
        let blocks: Vec<CodeBlock> = latest.code_blocks.iter().filter(|b| b.is_previewable).cloned().collect();
        if blocks.is_empty() {
            return false;
        }
        if matches!(&self.selection, Selection::Blocks(current) if same_content(current, &blocks)) {
            return false;
        }
        self.selection = Selection::Blocks(blocks);
        true
    }

    /// The user picked a block from the chat.
    pub fn select_code(&mut self, code: impl Into<String>) {
        self.selection = Selection::Code(code.into());
        self.manual = true;
        self.channel.clear_console();
    }

    /// The user changed the code in the editor.
    pub fn edit_code(&mut self, code: impl Into<String>) {
        self.selection = Selection::Code(code.into());
        self.manual = true;
    }

    /// The document for the current selection; empty when there is nothing
    /// to show.
    #[must_use]
    pub fn document(&self) -> String {
        match &self.selection {
            Selection::Empty => String::new(),
            Selection::Blocks(blocks) => compose_or_raw(blocks),
            Selection::Code(code) if code.is_empty() => String::new(),
            Selection::Code(code) => wrap_in_document(code).into_string(),
        }
    }

    /// The source shown in the editor: the user's code, or the latest
    /// followed block.
    #[must_use]
    pub fn code(&self) -> &str {
        match &self.selection {
            Selection::Empty => "",
            Selection::Blocks(blocks) => blocks.last().map_or("", |b| b.code.as_str()),
            Selection::Code(code) => code.as_str(),
        }
    }

    /// Render the current selection without forcing a re-run.
    pub fn refresh(&mut self) -> &RenderState {
        let document = self.document();
        self.channel.render(&document, self.run_count)
    }

    /// Force a fresh render, clearing the console and timing the render.
    pub fn run(&mut self) -> &RenderState {
        self.run_count += 1;
        self.channel.clear_console();
        let document = self.document();
        let started = Instant::now();
        self.channel.render(&document, self.run_count);
        self.elapsed = Some(started.elapsed());
        info!(run = self.run_count, elapsed = ?self.elapsed, manual = self.manual, "preview: run");
        self.channel.state()
    }

    /// Drop the selection, console and timing; resume following replies.
    pub fn reset(&mut self) {
        self.selection = Selection::Empty;
        self.manual = false;
        self.elapsed = None;
        self.channel.clear_console();
        self.channel.render("", self.run_count);
    }

    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.run_count
    }

    /// How long the last `run` took to render.
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed
    }

    #[must_use]
    pub fn is_manual(&self) -> bool {
        self.manual
    }

    #[must_use]
    pub fn channel(&self) -> &ExecutionChannel<F> {
        &self.channel
    }

    pub fn channel_mut(&mut self) -> &mut ExecutionChannel<F> {
        &mut self.channel
    }
}

/// Block ids are regenerated on every streamed snapshot; compare content.
fn same_content(a: &[CodeBlock], b: &[CodeBlock]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.language == y.language && x.code == y.code)
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
