//! End-to-end behaviour of the decode -> canonicalize -> range pipeline.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

use session_canon::{
    decode_and_canonicalize, extract_range, normalize, ContentBlock, MessageContent, RangeBounds,
    Role, SessionInput,
};

fn line(kind: &str, uuid: &str, ts: &str, content: serde_json::Value) -> String {
    json!({
        "type": kind,
        "uuid": uuid,
        "parentUuid": null,
        "sessionId": "s1",
        "timestamp": ts,
        "message": {"role": kind, "content": content}
    })
    .to_string()
}

fn ids(messages: &[session_canon::Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

#[test]
fn streamed_session_is_canonicalized() {
    let raw = [
        json!({"type": "file-history-snapshot", "messageId": "x", "snapshot": {}}).to_string(),
        line("user", "u1", "2025-05-01T10:00:00.000Z", json!("Refactor the parser")),
        line(
            "assistant",
            "a1",
            "2025-05-01T10:00:03.000Z",
            json!([{"type": "thinking", "thinking": "Looking at it"}]),
        ),
        line(
            "assistant",
            "a1",
            "2025-05-01T10:00:04.000Z",
            json!([
                {"type": "thinking", "thinking": "Looking at it"},
                {"type": "text", "text": "Sure."}
            ]),
        ),
        line(
            "assistant",
            "a1",
            "2025-05-01T10:00:05.000Z",
            json!([
                {"type": "thinking", "thinking": "Looking at it"},
                {"type": "text", "text": "Sure."},
                {"type": "tool_use", "id": "t1", "name": "Read", "input": {"file_path": "src/lib.rs"}}
            ]),
        ),
        line(
            "user",
            "r1",
            "2025-05-01T10:00:06.000Z",
            json!([{"type": "tool_result", "tool_use_id": "t1", "content": "fn main() {}"}]),
        ),
        line("user", "c1", "2025-05-01T10:00:07.000Z", json!("<command-name>/compact</command-name>")),
        json!({
            "type": "user", "uuid": "m1", "isMeta": true, "timestamp": "2025-05-01T10:00:08.000Z",
            "message": {"role": "user", "content": "Caveat: local commands"}
        })
        .to_string(),
        line("assistant", "a2", "2025-05-01T10:00:09.000Z", json!([{"type": "text", "text": "Done"}])),
        // torn final write
        r#"{"type":"assistant","uuid":"a3","message":{"role":"assis"#.to_string(),
    ]
    .join("\n");

    let messages = decode_and_canonicalize(&raw);
    assert_eq!(ids(&messages), ["u1", "a1", "a2"]);

    let a1 = &messages[1];
    assert_eq!(a1.role, Role::Assistant);
    assert_eq!(a1.content.blocks().len(), 3);
    assert!(matches!(
        &a1.content.blocks()[2],
        ContentBlock::ToolUse { name, .. } if name == "Read"
    ));
}

#[test]
fn malformed_line_between_valid_lines() {
    let raw = format!(
        "{}\n{{this is not json\n{}",
        line("assistant", "b", "2025-01-01T00:00:02Z", json!("second")),
        line("user", "a", "2025-01-01T00:00:01Z", json!("first")),
    );
    let messages = decode_and_canonicalize(&raw);
    assert_eq!(ids(&messages), ["a", "b"]);
}

#[test]
fn mixed_tool_result_record_kept_in_full() {
    let raw = line(
        "user",
        "mix",
        "2025-01-01T00:00:00Z",
        json!([
            {"type": "tool_result", "tool_use_id": "t", "content": "ok"},
            {"type": "text", "text": "also this"}
        ]),
    );
    let messages = decode_and_canonicalize(&raw);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content.blocks().len(), 2);
}

#[test]
fn annotated_duplicate_beats_longer_text() {
    let annotated = json!([{
        "type": "text",
        "text": "abc",
        "citations": [{"cited_text": "abc", "document_index": 0}]
    }]);
    let raw = [
        line("assistant", "a", "2025-01-01T00:00:00Z", annotated.clone()),
        line("assistant", "a", "2025-01-01T00:00:01Z", json!([{"type": "text", "text": "abcd"}])),
    ]
    .join("\n");

    let messages = decode_and_canonicalize(&raw);
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].content.text(), "abc");
    assert_eq!(serde_json::to_value(&messages[0].content).unwrap(), annotated);
}

#[test]
fn simplified_json_normalizes_to_tool_then_text() {
    let input = SessionInput::from_json_str(
        r#"[{"role":"assistant","content":"hi","tools":[{"name":"search","input":{"q":"x"}}]}]"#,
    )
    .unwrap();
    let messages = normalize(input);

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].role, Role::Assistant);
    match &messages[0].content {
        MessageContent::Blocks(blocks) => {
            assert_eq!(blocks.len(), 2);
            match &blocks[0] {
                ContentBlock::ToolUse { name, input, .. } => {
                    assert_eq!(name, "search");
                    assert_eq!(input.get("q"), Some(&json!("x")));
                }
                other => panic!("expected tool_use, got {:?}", other),
            }
            assert_eq!(blocks[1], ContentBlock::text("hi"));
        }
        other => panic!("expected blocks, got {:?}", other),
    }
}

#[test]
fn canonical_output_feeds_back_unchanged() {
    let raw = [
        line("user", "a", "2025-01-01T00:00:00Z", json!("q")),
        line("assistant", "b", "2025-01-01T00:00:01Z", json!([{"type": "text", "text": "r"}])),
    ]
    .join("\n");
    let messages = decode_and_canonicalize(&raw);

    let encoded = serde_json::to_string(&messages).unwrap();
    let again = normalize(SessionInput::from_json_str(&encoded).unwrap());
    assert_eq!(again, messages);

    let tail = extract_range(&again, &RangeBounds::default().from_id("b"));
    assert_eq!(ids(&tail), ["b"]);
}

fn arb_line() -> impl Strategy<Value = String> {
    let timestamp = prop_oneof![
        (0u32..60).prop_map(|s| format!("2025-01-01T00:00:{:02}Z", s)),
        Just("garbage".to_string()),
        Just(String::new()),
    ];
    prop_oneof![
        (0u8..6, timestamp, "[a-z ]{0,12}").prop_map(|(id, ts, text)| line(
            "assistant",
            &format!("id-{}", id),
            &ts,
            json!([{"type": "text", "text": text}])
        )),
        Just("{broken".to_string()),
        Just(String::new()),
    ]
}

proptest! {
    #[test]
    fn pipeline_is_idempotent_and_ordered(lines in prop::collection::vec(arb_line(), 0..40)) {
        let raw = lines.join("\n");
        let first = decode_and_canonicalize(&raw);
        let second = decode_and_canonicalize(&raw);
        prop_assert_eq!(&first, &second);

        let keys: Vec<_> = first.iter().map(|m| m.sort_key()).collect();
        prop_assert!(keys.windows(2).all(|w| w[0] <= w[1]));

        let mut seen = std::collections::HashSet::new();
        prop_assert!(first.iter().all(|m| seen.insert(m.id.clone())));
    }
}
