use serde_json::json;

use super::*;

#[test]
fn parses_console_message() {
    let msg = SandboxMessage::parse(&json!({ "type": "console", "consoleType": "warn", "message": "careful" }));
    assert_eq!(msg, Some(SandboxMessage::Console { kind: ConsoleKind::Warn, message: "careful".into() }));
}

#[test]
fn parses_render_complete() {
    assert_eq!(SandboxMessage::parse(&json!({ "type": "renderComplete" })), Some(SandboxMessage::RenderComplete));
}

#[test]
fn console_message_without_text_is_empty() {
    let msg = SandboxMessage::parse(&json!({ "type": "console", "consoleType": "log" }));
    assert_eq!(msg, Some(SandboxMessage::Console { kind: ConsoleKind::Log, message: String::new() }));
}

#[test]
fn unknown_or_malformed_payloads_are_none() {
    assert_eq!(SandboxMessage::parse(&json!({ "type": "resize", "height": 10 })), None);
    assert_eq!(SandboxMessage::parse(&json!({ "type": "console", "consoleType": "debug", "message": "x" })), None);
    assert_eq!(SandboxMessage::parse(&json!({ "consoleType": "log" })), None);
    assert_eq!(SandboxMessage::parse(&json!("console")), None);
    assert_eq!(SandboxMessage::parse(&json!(null)), None);
}

#[test]
fn serializes_with_browser_field_names() {
    let value = serde_json::to_value(SandboxMessage::Console { kind: ConsoleKind::Error, message: "boom".into() }).unwrap();
    assert_eq!(value, json!({ "type": "console", "consoleType": "error", "message": "boom" }));
}

#[test]
fn console_log_keeps_insertion_order() {
    let mut log = ConsoleLog::new();
    log.push(ConsoleKind::Log, "one");
    log.push(ConsoleKind::Error, "two");
    let messages: Vec<&str> = log.entries().iter().map(|e| e.message.as_str()).collect();
    assert_eq!(messages, ["one", "two"]);
    assert_ne!(log.entries()[0].id, log.entries()[1].id);
}

#[test]
fn console_log_drops_oldest_beyond_capacity() {
    let mut log = ConsoleLog::new();
    for i in 0..CONSOLE_CAPACITY + 5 {
        log.push(ConsoleKind::Info, i.to_string());
    }
    assert_eq!(log.len(), CONSOLE_CAPACITY);
    assert_eq!(log.entries()[0].message, "5");
    assert_eq!(log.entries()[CONSOLE_CAPACITY - 1].message, (CONSOLE_CAPACITY + 4).to_string());
}

#[test]
fn console_log_clear() {
    let mut log = ConsoleLog::new();
    log.push(ConsoleKind::Log, "x");
    log.clear();
    assert!(log.is_empty());
}
