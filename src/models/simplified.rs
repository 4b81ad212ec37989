//! Authoring-friendly message form.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::message::Role;

/// A hand-written turn: role, body text and optional tool calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<SimpleTool>,
}

/// A tool invocation attached to a [`SimpleMessage`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimpleTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Map<String, Value>>,
}

impl SimpleMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            tools: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tools: Vec::new(),
        }
    }

    /// Attach a tool call.
    pub fn with_tool(mut self, name: impl Into<String>, input: Map<String, Value>) -> Self {
        self.tools.push(SimpleTool {
            name: name.into(),
            input: Some(input),
        });
        self
    }
}
