//! Input normalization and range extraction.
//!
//! Three input shapes converge on the canonical sequence: raw JSONL text,
//! the simplified authoring form, and an already-canonical message list.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::canonical::{decode_and_canonicalize_with, CanonOptions};
use crate::error::{Error, Result};
use crate::models::{ContentBlock, Message, MessageContent, Role, SimpleMessage};

/// The accepted input shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    /// Raw line-delimited transcript text.
    Raw(String),
    /// Hand-authored turns.
    Simplified(Vec<SimpleMessage>),
    /// Messages that are already canonical; passed through as-is.
    Canonical(Vec<Message>),
}

impl SessionInput {
    /// Classify arbitrary text.
    ///
    /// Text starting with `[` or `"` is read as JSON and classified with
    /// [`SessionInput::from_json_value`]; anything else is raw JSONL.
    pub fn from_text(text: String) -> Result<Self> {
        match text.trim_start().chars().next() {
            Some('[') | Some('"') => Self::from_json_str(&text),
            _ => Ok(SessionInput::Raw(text)),
        }
    }

    /// Parse a JSON document and classify it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Self::from_json_value(serde_json::from_str(json)?)
    }

    /// Classify a JSON value.
    ///
    /// This is a heuristic, not a schema check: a string is raw text; for an
    /// array only the first element is inspected, and if it has a `role` but
    /// no `uuid` the whole array is taken as the simplified form. Any other
    /// array is taken as canonical.
    pub fn from_json_value(value: Value) -> Result<Self> {
        match value {
            Value::String(text) => Ok(SessionInput::Raw(text)),
            Value::Array(items) => {
                let simplified = items.first().is_some_and(|first| {
                    first.get("role").is_some() && first.get("uuid").is_none()
                });
                if simplified {
                    Ok(SessionInput::Simplified(serde_json::from_value(
                        Value::Array(items),
                    )?))
                } else {
                    Ok(SessionInput::Canonical(serde_json::from_value(
                        Value::Array(items),
                    )?))
                }
            }
            other => Err(Error::UnrecognizedInput(format!(
                "expected a string or an array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Normalize any accepted input to the canonical sequence.
pub fn normalize(input: SessionInput) -> Vec<Message> {
    normalize_with(input, &CanonOptions::default())
}

/// Normalize with explicit canonicalization options.
pub fn normalize_with(input: SessionInput, options: &CanonOptions) -> Vec<Message> {
    match input {
        SessionInput::Raw(text) => decode_and_canonicalize_with(&text, options),
        SessionInput::Simplified(entries) => from_simplified(&entries),
        SessionInput::Canonical(messages) => messages,
    }
}

/// Convert simplified turns, stamping every message with the current time.
pub fn from_simplified(entries: &[SimpleMessage]) -> Vec<Message> {
    let now = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    from_simplified_at(entries, &now)
}

/// Convert simplified turns using a fixed timestamp.
///
/// Ids form a linear chain `msg-0 <- msg-1 <- ...`. Tool calls become
/// leading `tool_use` blocks with ids `tool-<turn>-<block>`. Assistant turns
/// get a trailing text block; user turns keep the body as a plain string.
pub fn from_simplified_at(entries: &[SimpleMessage], timestamp: &str) -> Vec<Message> {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let content = match entry.role {
                Role::User => MessageContent::Text(entry.content.clone()),
                Role::Assistant => {
                    let mut blocks: Vec<ContentBlock> = entry
                        .tools
                        .iter()
                        .enumerate()
                        .map(|(j, tool)| {
                            ContentBlock::tool_use(
                                format!("tool-{}-{}", i, j),
                                tool.name.clone(),
                                tool.input.clone().unwrap_or_default(),
                            )
                        })
                        .collect();
                    if !entry.content.is_empty() {
                        blocks.push(ContentBlock::text(entry.content.clone()));
                    }
                    MessageContent::Blocks(blocks)
                }
            };

            Message {
                id: format!("msg-{}", i),
                parent_id: i.checked_sub(1).map(|prev| format!("msg-{}", prev)),
                timestamp: timestamp.to_string(),
                role: entry.role,
                content,
            }
        })
        .collect()
}

/// Bounds for [`extract_range`]. All fields are optional.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeBounds {
    #[serde(default)]
    pub from_id: Option<String>,
    #[serde(default)]
    pub to_id: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

impl RangeBounds {
    pub fn from_id(mut self, id: impl Into<String>) -> Self {
        self.from_id = Some(id.into());
        self
    }

    pub fn to_id(mut self, id: impl Into<String>) -> Self {
        self.to_id = Some(id.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Slice a canonical sequence.
///
/// `from_id` is resolved first and keeps the match and everything after it;
/// `to_id` is then resolved in that result and keeps everything through the
/// match; `limit` truncates last. A bound that isn't found, an empty id, or a
/// zero limit leaves the sequence unchanged.
pub fn extract_range(messages: &[Message], bounds: &RangeBounds) -> Vec<Message> {
    let mut range = messages;

    if let Some(from) = bounds.from_id.as_deref().filter(|id| !id.is_empty()) {
        if let Some(start) = range.iter().position(|m| m.id == from) {
            range = &range[start..];
        }
    }

    if let Some(to) = bounds.to_id.as_deref().filter(|id| !id.is_empty()) {
        if let Some(end) = range.iter().position(|m| m.id == to) {
            range = &range[..=end];
        }
    }

    if let Some(limit) = bounds.limit.filter(|&n| n > 0) {
        range = &range[..limit.min(range.len())];
    }

    range.to_vec()
}
