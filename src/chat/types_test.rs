use super::*;

#[test]
fn draft_snapshots_share_id_and_reextract_blocks() {
    let mut draft = AssistantDraft::new();
    let first = draft.push("```html\n<p>");
    assert!(first.code_blocks.is_empty());

    let second = draft.push("hi</p>\n```");
    assert_eq!(first.id, second.id);
    assert_eq!(first.timestamp, second.timestamp);
    assert_eq!(second.content, "```html\n<p>hi</p>\n```");
    assert_eq!(second.code_blocks.len(), 1);
    assert_eq!(second.code_blocks[0].code, "<p>hi</p>");
}

#[test]
fn upsert_appends_after_user_turn() {
    let mut convo = Conversation::new();
    convo.push(Message::user("hello"));
    let mut draft = AssistantDraft::new();
    convo.upsert_assistant(draft.push("Hi"));
    assert_eq!(convo.len(), 2);
    assert_eq!(convo.messages()[1].content, "Hi");
}

#[test]
fn upsert_replaces_trailing_assistant_turn() {
    let mut convo = Conversation::new();
    convo.push(Message::user("hello"));
    let mut draft = AssistantDraft::new();
    convo.upsert_assistant(draft.push("Hi"));
    convo.upsert_assistant(draft.push(" there"));
    assert_eq!(convo.len(), 2);
    assert_eq!(convo.messages()[1].content, "Hi there");
}

#[test]
fn upsert_leaves_earlier_messages_untouched() {
    let user = Message::user("first");
    let mut convo = Conversation::from_messages(vec![user.clone()]);
    convo.upsert_assistant(AssistantDraft::new().push("reply"));
    assert_eq!(convo.messages()[0], user);
}

#[test]
fn assistant_error_states_reason() {
    let msg = Message::assistant_error("boom");
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.content, "Sorry, I encountered an error: boom. Please try again.");
    assert!(msg.code_blocks.is_empty());
}

#[test]
fn wire_messages_carry_role_and_content_only() {
    let mut convo = Conversation::new();
    convo.push(Message::user("q"));
    convo.upsert_assistant(AssistantDraft::new().push("a"));
    let json = serde_json::to_value(convo.wire_messages()).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            { "role": "user", "content": "q" },
            { "role": "assistant", "content": "a" }
        ])
    );
}

#[test]
fn message_serializes_camel_case_with_rfc3339_timestamp() {
    let msg = AssistantDraft::new().push("```css\na{}\n```");
    let json = serde_json::to_value(&msg).unwrap();
    assert!(json.get("codeBlocks").is_some());
    assert_eq!(json["codeBlocks"][0]["isPreviewable"], true);
    let ts = json["timestamp"].as_str().unwrap();
    assert!(ts.contains('T'));
}

#[test]
fn latest_assistant_skips_trailing_user_turn() {
    let mut convo = Conversation::new();
    convo.upsert_assistant(AssistantDraft::new().push("one"));
    convo.push(Message::user("two"));
    assert_eq!(convo.latest_assistant().unwrap().content, "one");
}
