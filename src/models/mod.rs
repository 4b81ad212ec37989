//! Data models for session transcripts.

pub mod message;
pub mod session;
pub mod simplified;

pub use message::{parse_timestamp, ContentBlock, Message, MessageContent, Role};
pub use session::SessionSummary;
pub use simplified::{SimpleMessage, SimpleTool};
