//! session-canon - canonical message sequences from Claude Code transcripts.
//!
//! A session transcript is an append-only JSONL log. The producer re-emits a
//! message every time its content grows, interleaves snapshots and meta
//! records, and may leave a torn final line. This crate decodes such a log,
//! keeps the most complete version of each message, and orders the result by
//! time:
//!
//! ```
//! use session_canon::{decode_and_canonicalize, extract_range, RangeBounds};
//!
//! let raw = r#"{"type":"user","uuid":"a","timestamp":"2025-01-01T00:00:00Z","message":{"role":"user","content":"hi"}}"#;
//! let messages = decode_and_canonicalize(raw);
//! let first = extract_range(&messages, &RangeBounds::default().limit(1));
//! assert_eq!(first[0].id, "a");
//! ```

pub mod canonical;
pub mod config;
pub mod decoder;
pub mod error;
pub mod models;
pub mod normalize;
pub mod services;

pub use canonical::{
    canonicalize, decode_and_canonicalize, decode_and_canonicalize_with, CanonOptions,
    MissingIdPolicy,
};
pub use decoder::{decode_records, decode_records_with_stats, DecodeStats};
pub use error::{Error, Result};
pub use models::{ContentBlock, Message, MessageContent, Role, SimpleMessage, SimpleTool};
pub use normalize::{
    extract_range, from_simplified, from_simplified_at, normalize, normalize_with, RangeBounds,
    SessionInput,
};
