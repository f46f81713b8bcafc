use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::json;

use super::*;
use crate::sandbox::instrument::INSTRUMENTATION_SNIPPET;

// =========================================================================
// RecordingFrame
// =========================================================================

#[derive(Default)]
struct RecordingFrame {
    loads: Vec<String>,
    fail: bool,
}

impl SandboxFrame for RecordingFrame {
    fn load(&mut self, document: &str) -> Result<(), SandboxError> {
        if self.fail {
            return Err(SandboxError::Render("document handle unavailable".into()));
        }
        self.loads.push(document.to_owned());
        Ok(())
    }
}

const DOC: &str = "<!DOCTYPE html><html><head></head><body><p>x</p></body></html>";

// =========================================================================
// render
// =========================================================================

#[test]
fn render_loads_instrumented_document() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    assert_eq!(channel.render(DOC, 1), &RenderState::Rendered);

    let loads = &channel.frame().loads;
    assert_eq!(loads.len(), 1);
    assert!(loads[0].contains(INSTRUMENTATION_SNIPPET));
    assert!(loads[0].contains("<p>x</p>"));
}

#[test]
fn same_document_and_run_is_not_rerendered() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.render(DOC, 1);
    channel.render(DOC, 1);
    assert_eq!(channel.frame().loads.len(), 1);
}

#[test]
fn bumping_run_forces_fresh_render() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.render(DOC, 1);
    channel.render(DOC, 2);
    channel.render("<p>other</p>", 2);
    let loads = &channel.frame().loads;
    assert_eq!(loads.len(), 3);
    assert_eq!(loads[0], loads[1]);
}

#[test]
fn empty_document_goes_idle_without_loading() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.render(DOC, 1);
    assert_eq!(channel.render("", 1), &RenderState::Idle);
    assert_eq!(channel.frame().loads.len(), 1);
}

#[test]
fn render_failure_is_reported_not_thrown() {
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = reported.clone();
    let mut channel = ExecutionChannel::new(RecordingFrame { loads: Vec::new(), fail: true });
    channel.on_error(move |reason| sink.lock().unwrap().push(reason.to_owned()));

    let state = channel.render(DOC, 1).clone();
    assert_eq!(state, RenderState::Failed("Failed to render preview: document handle unavailable".into()));
    assert_eq!(reported.lock().unwrap().len(), 1);

    channel.render(DOC, 1);
    assert_eq!(reported.lock().unwrap().len(), 1, "unchanged input is not retried");

    channel.frame_mut().fail = false;
    assert_eq!(channel.render(DOC, 2), &RenderState::Rendered);
}

// =========================================================================
// handle_message
// =========================================================================

#[test]
fn console_messages_append_entries_in_order() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.handle_message(&json!({ "type": "console", "consoleType": "log", "message": "first" }));
    channel.handle_message(&json!({ "type": "console", "consoleType": "error", "message": "second" }));

    let console = channel.console();
    assert_eq!(console.len(), 2);
    assert_eq!(console[0].kind, ConsoleKind::Log);
    assert_eq!(console[1].message, "second");
}

#[test]
fn render_complete_invokes_callback() {
    let count = Arc::new(AtomicUsize::new(0));
    let hits = count.clone();
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.on_render_complete(move || {
        hits.fetch_add(1, Ordering::SeqCst);
    });

    let decoded = channel.handle_message(&json!({ "type": "renderComplete" }));
    assert_eq!(decoded, Some(SandboxMessage::RenderComplete));
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert!(channel.console().is_empty());
}

#[test]
fn unrecognized_messages_are_ignored() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    assert_eq!(channel.handle_message(&json!({ "type": "hello" })), None);
    assert_eq!(channel.handle_message(&json!(42)), None);
    assert!(channel.console().is_empty());
}

#[test]
fn clear_console_empties_entries() {
    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.handle_message(&json!({ "type": "console", "consoleType": "info", "message": "x" }));
    channel.clear_console();
    assert!(channel.console().is_empty());
}

#[tokio::test]
async fn listen_drains_channel_until_closed() {
    let (tx, mut rx) = mpsc::channel(8);
    tx.send(json!({ "type": "console", "consoleType": "warn", "message": "a" })).await.unwrap();
    tx.send(json!({ "type": "bogus" })).await.unwrap();
    tx.send(json!({ "type": "console", "consoleType": "info", "message": "b" })).await.unwrap();
    drop(tx);

    let mut channel = ExecutionChannel::new(RecordingFrame::default());
    channel.listen(&mut rx).await;

    let messages: Vec<&str> = channel.console().iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["a", "b"]);
}

// =========================================================================
// SrcdocFrame
// =========================================================================

#[test]
fn srcdoc_frame_escapes_document_into_sandboxed_iframe() {
    let mut frame = SrcdocFrame::new();
    frame.load("<p class=\"a\">&</p>").unwrap();
    let markup = frame.markup().unwrap();
    assert!(markup.starts_with("<iframe sandbox=\"allow-scripts allow-modals\""));
    assert!(markup.contains("srcdoc=\"&lt;p class=&quot;a&quot;&gt;&amp;&lt;/p&gt;\""));
}

#[test]
fn detached_frame_fails_render() {
    let mut channel = ExecutionChannel::new(SrcdocFrame::detached());
    let state = channel.render(DOC, 1).clone();
    assert_eq!(state, RenderState::Failed("preview frame is not attached".into()));
    assert!(channel.frame().markup().is_none());

    channel.frame_mut().set_attached(true);
    channel.render(DOC, 2);
    assert!(channel.frame().markup().unwrap().contains("renderComplete"));
}
