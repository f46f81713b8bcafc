//! Server-sent event stream → assistant text.
//!
//! DESIGN
//! ======
//! The body is newline-delimited records: `:` comments, blank lines, and
//! `data: <json>` payloads, ending with `data: [DONE]`. A record is only
//! consumed once its terminating `\n` has been buffered, so records split
//! across reads are parsed whole. Bytes are buffered too: a multi-byte UTF-8
//! character split across two reads is held back until complete.
//!
//! A data record whose JSON fails to parse is pushed back onto the front of
//! the buffer and decoding pauses until the next read. If the same record
//! still fails once more data has arrived it cannot be completed by later
//! reads (it already ended in `\n`) and is dropped so it cannot stall the
//! rest of the stream.

use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use super::types::{AssistantDraft, ChatError, Conversation};

pub const DATA_PREFIX: &str = "data: ";
pub const DONE_SENTINEL: &str = "[DONE]";

/// One decoded record of interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    /// Incremental assistant text (`choices[0].delta.content`).
    Delta(String),
    /// The `[DONE]` sentinel.
    Done,
}

// =============================================================================
// DECODER
// =============================================================================

/// Incremental record decoder. Feed it raw body chunks in arrival order.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Decoded text not yet consumed as complete records.
    buffer: String,
    /// Trailing bytes of an incomplete UTF-8 sequence.
    pending: Vec<u8>,
    /// The record last pushed back after a parse failure.
    requeued: Option<String>,
    done: bool,
}

impl SseDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `true` once `[DONE]` has been seen; later input is ignored.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Decode one chunk, returning the events it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        self.decode_utf8(chunk);
        self.drain_lines()
    }

    /// Flush a final record that arrived without a trailing newline.
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if self.done {
            return Vec::new();
        }
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.buffer.push_str(&String::from_utf8_lossy(&rest));
        }
        let mut events = self.drain_lines();
        let tail = std::mem::take(&mut self.buffer);
        if !self.done && !tail.trim().is_empty() {
            match parse_record(strip_cr(&tail)) {
                Record::Event(event) => {
                    self.done = event == SseEvent::Done;
                    events.push(event);
                }
                Record::Malformed(line) => warn!(line = %line, "sse: dropping malformed final record"),
                Record::Skip => {}
            }
        }
        events
    }

    fn decode_utf8(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    self.buffer.push_str(&String::from_utf8_lossy(valid));
                    match e.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }

    fn drain_lines(&mut self) -> Vec<SseEvent> {
        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let raw: String = self.buffer.drain(..=newline).collect();
            let line = strip_cr(&raw[..raw.len() - 1]);
            match parse_record(line) {
                Record::Skip => {}
                Record::Event(SseEvent::Done) => {
                    self.done = true;
                    self.buffer.clear();
                    self.requeued = None;
                    events.push(SseEvent::Done);
                    break;
                }
                Record::Event(event) => {
                    self.requeued = None;
                    events.push(event);
                }
                Record::Malformed(line) => {
                    if self.requeued.as_deref() == Some(line.as_str()) {
                        warn!(line = %line, "sse: dropping record that stays malformed");
                        self.requeued = None;
                        continue;
                    }
                    debug!(line = %line, "sse: re-queueing unparsable record");
                    self.buffer.insert(0, '\n');
                    self.buffer.insert_str(0, &line);
                    self.requeued = Some(line);
                    break;
                }
            }
        }
        events
    }
}

enum Record {
    Skip,
    Event(SseEvent),
    Malformed(String),
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}

fn parse_record(line: &str) -> Record {
    if line.starts_with(':') || line.trim().is_empty() {
        return Record::Skip;
    }
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Record::Skip;
    };
    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Record::Event(SseEvent::Done);
    }
    match serde_json::from_str::<Value>(payload) {
        Ok(root) => match delta_content(&root) {
            Some(text) => Record::Event(SseEvent::Delta(text.to_owned())),
            None => Record::Skip,
        },
        Err(_) => Record::Malformed(line.to_owned()),
    }
}

/// `choices[0].delta.content`, when present and non-empty.
fn delta_content(root: &Value) -> Option<&str> {
    root.get("choices")
        .and_then(Value::as_array)
        .and_then(|choices| choices.first())
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

// =============================================================================
// AGGREGATION
// =============================================================================

/// Drive a body stream into `conversation`, upserting the assistant reply
/// after every fragment. Returns the final reply text.
///
/// Stops at `[DONE]` or end of stream.
///
/// # Errors
///
/// Returns [`ChatError::Stream`] if a read fails; fragments applied before
/// the failure stay in the conversation. A body that ends without a single
/// byte is [`ChatError::MissingBody`].
pub async fn aggregate_stream<S, B, E>(mut body: S, conversation: &mut Conversation) -> Result<String, ChatError>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut decoder = SseDecoder::new();
    let mut draft = AssistantDraft::new();
    let mut received = 0usize;

    while let Some(chunk) = body.next().await {
        let chunk = chunk.map_err(|e| ChatError::Stream(e.to_string()))?;
        received += chunk.as_ref().len();
        for event in decoder.feed(chunk.as_ref()) {
            apply(event, &mut draft, conversation);
        }
        if decoder.is_done() {
            return Ok(draft.content().to_owned());
        }
    }

    if received == 0 {
        return Err(ChatError::MissingBody);
    }
    for event in decoder.finish() {
        apply(event, &mut draft, conversation);
    }
    Ok(draft.content().to_owned())
}

fn apply(event: SseEvent, draft: &mut AssistantDraft, conversation: &mut Conversation) {
    if let SseEvent::Delta(text) = event {
        conversation.upsert_assistant(draft.push(&text));
    }
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod tests;
