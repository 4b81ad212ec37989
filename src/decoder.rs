//! Record decoder - turns raw JSONL text into candidate messages.
//!
//! Every line is decoded independently. Lines that fail to parse or that
//! don't carry a conversational turn are dropped without error, since the
//! log may be read while it is still being written.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::models::{Message, MessageContent, Role};

/// Markers that identify control-channel text in a plain-string body.
const CONTROL_MARKERS: &[&str] = &[
    "<command-name>",
    "<local-command-stdout>",
    "<system-reminder>",
];

/// One JSONL line as written by the producer. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRecord {
    #[serde(rename = "type", default)]
    record_type: Option<String>,
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    parent_uuid: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    is_meta: Option<bool>,
    /// Decoded into [`RawPayload`] only once the record is known to be a turn.
    #[serde(default)]
    message: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawPayload {
    role: Role,
    content: MessageContent,
}

/// Why a line didn't produce a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Skip {
    Blank,
    Malformed,
    Structural,
    Meta,
    Control,
    ToolResultsOnly,
    ThinkingOnly,
}

/// Per-call counters of what the decoder kept and dropped.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStats {
    pub lines: usize,
    pub emitted: usize,
    pub blank: usize,
    pub malformed: usize,
    pub structural: usize,
    pub meta: usize,
    pub control: usize,
    pub tool_results_only: usize,
    pub thinking_only: usize,
}

impl DecodeStats {
    fn record(&mut self, skip: Skip) {
        match skip {
            Skip::Blank => self.blank += 1,
            Skip::Malformed => self.malformed += 1,
            Skip::Structural => self.structural += 1,
            Skip::Meta => self.meta += 1,
            Skip::Control => self.control += 1,
            Skip::ToolResultsOnly => self.tool_results_only += 1,
            Skip::ThinkingOnly => self.thinking_only += 1,
        }
    }

    /// Total number of lines that were dropped.
    pub fn dropped(&self) -> usize {
        self.lines - self.emitted
    }
}

/// Decode raw JSONL text into candidate messages, in line order.
pub fn decode_records(raw: &str) -> Vec<Message> {
    decode_records_with_stats(raw).0
}

/// Like [`decode_records`], also reporting what was dropped and why.
pub fn decode_records_with_stats(raw: &str) -> (Vec<Message>, DecodeStats) {
    let mut stats = DecodeStats::default();
    let mut messages = Vec::new();

    for (index, line) in raw.lines().enumerate() {
        stats.lines += 1;
        match decode_line(line) {
            Ok(message) => {
                stats.emitted += 1;
                messages.push(message);
            }
            Err(skip) => {
                if skip != Skip::Blank {
                    trace!(line = index + 1, reason = ?skip, "dropping record");
                }
                stats.record(skip);
            }
        }
    }

    debug!(
        lines = stats.lines,
        emitted = stats.emitted,
        malformed = stats.malformed,
        "decoded transcript"
    );
    (messages, stats)
}

fn decode_line(line: &str) -> Result<Message, Skip> {
    if line.trim().is_empty() {
        return Err(Skip::Blank);
    }

    let record: RawRecord = serde_json::from_str(line).map_err(|_| Skip::Malformed)?;

    // Records without a type tag are accepted as long as they carry a payload.
    if let Some(kind) = record.record_type.as_deref() {
        if kind != "user" && kind != "assistant" {
            return Err(Skip::Structural);
        }
    }
    let message = record.message.ok_or(Skip::Structural)?;

    if record.is_meta.unwrap_or(false) {
        return Err(Skip::Meta);
    }

    let payload: RawPayload = serde_json::from_value(message).map_err(|_| Skip::Malformed)?;

    match &payload.content {
        MessageContent::Text(text) => {
            if CONTROL_MARKERS.iter().any(|marker| text.contains(marker)) {
                return Err(Skip::Control);
            }
        }
        MessageContent::Blocks(blocks) => {
            // `all` is true for an empty list, so empty block lists are dropped too.
            if blocks.iter().all(|block| block.is_tool_result()) {
                return Err(Skip::ToolResultsOnly);
            }
            if blocks.iter().all(|block| block.is_thinking()) {
                return Err(Skip::ThinkingOnly);
            }
        }
    }

    Ok(Message {
        id: record.uuid.unwrap_or_default(),
        parent_id: record.parent_uuid.filter(|parent| !parent.is_empty()),
        timestamp: record.timestamp.unwrap_or_default(),
        role: payload.role,
        content: payload.content,
    })
}
