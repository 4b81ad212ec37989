//! Message types shared by every stage of the pipeline.
//!
//! Field names serialize with the producer's wire names (`uuid`,
//! `parentUuid`, ...) so collaborators see the same shape the log uses.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Speaker of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One unit of structured message content.
///
/// Known variants keep every key they don't model in `extra` (citations,
/// `cache_control`, ...), so a decoded block encodes back to the same JSON.
/// Blocks with an unrecognized `type` (images, newer block kinds) or a shape
/// that doesn't match a known variant are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentBlock {
    Text {
        text: String,
        extra: Map<String, Value>,
    },
    Thinking {
        thinking: String,
        signature: Option<String>,
        extra: Map<String, Value>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
        extra: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        is_error: Option<bool>,
        extra: Map<String, Value>,
    },
    Other(Value),
}

impl ContentBlock {
    /// Build a plain text block.
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text {
            text: text.into(),
            extra: Map::new(),
        }
    }

    /// Build a tool invocation block.
    pub fn tool_use(
        id: impl Into<String>,
        name: impl Into<String>,
        input: Map<String, Value>,
    ) -> Self {
        ContentBlock::ToolUse {
            id: id.into(),
            name: name.into(),
            input,
            extra: Map::new(),
        }
    }

    /// The block's `type` tag as it appears on the wire.
    pub fn block_type(&self) -> Option<&str> {
        match self {
            ContentBlock::Text { .. } => Some("text"),
            ContentBlock::Thinking { .. } => Some("thinking"),
            ContentBlock::ToolUse { .. } => Some("tool_use"),
            ContentBlock::ToolResult { .. } => Some("tool_result"),
            ContentBlock::Other(value) => value.get("type").and_then(Value::as_str),
        }
    }

    pub fn is_tool_result(&self) -> bool {
        self.block_type() == Some("tool_result")
    }

    pub fn is_thinking(&self) -> bool {
        self.block_type() == Some("thinking")
    }
}

/// The modelled fields of the known block shapes, used for decoding.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockRepr {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
        #[serde(default)]
        signature: Option<String>,
    },
    ToolUse {
        id: String,
        name: String,
        input: Map<String, Value>,
    },
    ToolResult {
        tool_use_id: String,
        content: Value,
        #[serde(default)]
        is_error: Option<bool>,
    },
}

impl BlockRepr {
    /// Attach the keys left over after removing the modelled ones.
    ///
    /// Optional fields are only taken out when they held a value, so an
    /// explicit `null` stays in `extra` and is written back.
    fn into_block(self, mut extra: Map<String, Value>) -> ContentBlock {
        extra.remove("type");
        match self {
            BlockRepr::Text { text } => {
                extra.remove("text");
                ContentBlock::Text { text, extra }
            }
            BlockRepr::Thinking { thinking, signature } => {
                extra.remove("thinking");
                if signature.is_some() {
                    extra.remove("signature");
                }
                ContentBlock::Thinking {
                    thinking,
                    signature,
                    extra,
                }
            }
            BlockRepr::ToolUse { id, name, input } => {
                for key in ["id", "name", "input"] {
                    extra.remove(key);
                }
                ContentBlock::ToolUse {
                    id,
                    name,
                    input,
                    extra,
                }
            }
            BlockRepr::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                extra.remove("tool_use_id");
                extra.remove("content");
                if is_error.is_some() {
                    extra.remove("is_error");
                }
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                    extra,
                }
            }
        }
    }
}

impl<'de> Deserialize<'de> for ContentBlock {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let repr = match BlockRepr::deserialize(&value) {
            Ok(repr) => repr,
            Err(_) => return Ok(ContentBlock::Other(value)),
        };
        match value {
            Value::Object(map) => Ok(repr.into_block(map)),
            other => Ok(ContentBlock::Other(other)),
        }
    }
}

impl ContentBlock {
    /// Write the `type` tag, modelled fields and extra keys of a known block.
    fn write_fields<M: SerializeMap>(&self, map: &mut M) -> Result<(), M::Error> {
        let extra = match self {
            ContentBlock::Text { text, extra } => {
                map.serialize_entry("type", "text")?;
                map.serialize_entry("text", text)?;
                extra
            }
            ContentBlock::Thinking {
                thinking,
                signature,
                extra,
            } => {
                map.serialize_entry("type", "thinking")?;
                map.serialize_entry("thinking", thinking)?;
                if let Some(signature) = signature {
                    map.serialize_entry("signature", signature)?;
                }
                extra
            }
            ContentBlock::ToolUse {
                id,
                name,
                input,
                extra,
            } => {
                map.serialize_entry("type", "tool_use")?;
                map.serialize_entry("id", id)?;
                map.serialize_entry("name", name)?;
                map.serialize_entry("input", input)?;
                extra
            }
            ContentBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
                extra,
            } => {
                map.serialize_entry("type", "tool_result")?;
                map.serialize_entry("tool_use_id", tool_use_id)?;
                map.serialize_entry("content", content)?;
                if let Some(is_error) = is_error {
                    map.serialize_entry("is_error", is_error)?;
                }
                extra
            }
            // Written verbatim by `Serialize`.
            ContentBlock::Other(_) => return Ok(()),
        };
        for (key, value) in extra {
            map.serialize_entry(key, value)?;
        }
        Ok(())
    }
}

impl Serialize for ContentBlock {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ContentBlock::Other(value) => value.serialize(serializer),
            known => {
                let mut map = serializer.serialize_map(None)?;
                known.write_fields(&mut map)?;
                map.end()
            }
        }
    }
}

/// Message body - either a plain string or a sequence of blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl MessageContent {
    /// First text block, or the plain string body.
    pub fn text(&self) -> &str {
        match self {
            MessageContent::Text(text) => text,
            MessageContent::Blocks(blocks) => blocks
                .iter()
                .find_map(|block| match block {
                    ContentBlock::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .unwrap_or(""),
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        match self {
            MessageContent::Text(_) => &[],
            MessageContent::Blocks(blocks) => blocks,
        }
    }
}

/// A canonical conversational turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "uuid", default)]
    pub id: String,
    #[serde(rename = "parentUuid", default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub timestamp: String,
    pub role: Role,
    pub content: MessageContent,
}

impl Message {
    /// Completeness measure: length of the serialized `content` field.
    ///
    /// The producer re-emits a message as it grows, so the longest encoding
    /// of a given id is the most complete one.
    pub fn content_weight(&self) -> usize {
        serde_json::to_string(&self.content)
            .map(|encoded| encoded.len())
            .unwrap_or(0)
    }

    /// Parsed timestamp, if the string is a recognizable instant.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Timestamp used for ordering; unparseable values sort as the epoch.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.parsed_timestamp().unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Parse an ISO-8601 instant.
///
/// Accepts RFC 3339, zone-less date-times (taken as UTC) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_known_blocks_round_trip_wire_shape() {
        let wire = json!([
            {"type": "text", "text": "hello"},
            {"type": "tool_use", "id": "t1", "name": "Read", "input": {"path": "a.rs"}},
            {"type": "tool_result", "tool_use_id": "t1", "content": "ok"}
        ]);
        let content: MessageContent = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(content.blocks().len(), 3);
        assert_eq!(serde_json::to_value(&content).unwrap(), wire);
    }

    #[test]
    fn test_extra_keys_on_known_blocks_round_trip_exactly() {
        let wire = concat!(
            r#"[{"type":"text","text":"hi","citations":[{"url":"https://a"}]},"#,
            r#"{"type":"thinking","thinking":"hm","signature":null},"#,
            r#"{"type":"tool_use","id":"t","name":"Bash","input":{"cmd":"ls"},"cache_control":{"type":"ephemeral"}},"#,
            r#"{"type":"tool_result","tool_use_id":"t","content":"ok","is_error":false}]"#
        );
        let content: MessageContent = serde_json::from_str(wire).unwrap();

        match &content.blocks()[0] {
            ContentBlock::Text { text, extra } => {
                assert_eq!(text, "hi");
                assert!(extra.contains_key("citations"));
            }
            other => panic!("expected text block, got {:?}", other),
        }
        assert!(matches!(
            content.blocks()[3],
            ContentBlock::ToolResult { is_error: Some(false), .. }
        ));
        assert_eq!(serde_json::to_string(&content).unwrap(), wire);
    }

    #[test]
    fn test_content_weight_counts_extra_keys() {
        let with_citations = Message {
            id: "a".into(),
            parent_id: None,
            timestamp: String::new(),
            role: Role::Assistant,
            content: serde_json::from_str(
                r#"[{"type":"text","text":"abc","citations":[{"url":"https://a"}]}]"#,
            )
            .unwrap(),
        };
        let plain = Message {
            content: MessageContent::Blocks(vec![ContentBlock::text("abcd")]),
            ..with_citations.clone()
        };
        assert!(with_citations.content_weight() > plain.content_weight());
    }

    #[test]
    fn test_unknown_block_kept_verbatim() {
        let wire = json!({"type": "image", "source": {"type": "base64", "data": "AAAA"}});
        let block: ContentBlock = serde_json::from_value(wire.clone()).unwrap();
        assert_eq!(block.block_type(), Some("image"));
        assert_eq!(serde_json::to_value(&block).unwrap(), wire);
    }

    #[test]
    fn test_malformed_tool_result_still_classified() {
        let block: ContentBlock =
            serde_json::from_value(json!({"type": "tool_result", "content": 3})).unwrap();
        assert!(matches!(block, ContentBlock::Other(_)));
        assert!(block.is_tool_result());
    }

    #[test]
    fn test_text_prefers_first_text_block() {
        let content = MessageContent::Blocks(vec![
            ContentBlock::Thinking {
                thinking: "hmm".into(),
                signature: None,
                extra: Map::new(),
            },
            ContentBlock::text("first"),
            ContentBlock::text("second"),
        ]);
        assert_eq!(content.text(), "first");
        assert_eq!(MessageContent::Text("plain".into()).text(), "plain");
    }

    #[test]
    fn test_parse_timestamp_variants() {
        assert!(parse_timestamp("2025-01-02T03:04:05.678Z").is_some());
        assert!(parse_timestamp("2025-01-02T03:04:05+02:00").is_some());
        assert!(parse_timestamp("2025-01-02T03:04:05").is_some());
        assert!(parse_timestamp("2025-01-02").is_some());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_sort_key_defaults_to_epoch() {
        let msg = Message {
            id: "a".into(),
            parent_id: None,
            timestamp: "not a time".into(),
            role: Role::User,
            content: MessageContent::Text("x".into()),
        };
        assert_eq!(msg.sort_key(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn test_message_serializes_wire_names() {
        let msg = Message {
            id: "m1".into(),
            parent_id: None,
            timestamp: "2025-01-01T00:00:00Z".into(),
            role: Role::Assistant,
            content: MessageContent::Text("hi".into()),
        };
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "uuid": "m1",
                "parentUuid": null,
                "timestamp": "2025-01-01T00:00:00Z",
                "role": "assistant",
                "content": "hi"
            })
        );
    }
}
