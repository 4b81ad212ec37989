//! Session summary data.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use super::message::{Message, Role};

/// Summary of one canonicalized session file.
#[derive(Debug, Clone)]
pub struct SessionSummary {
    /// Session id (file stem of the JSONL file)
    pub id: String,
    /// Timestamp of first canonical message
    pub first_message: DateTime<Utc>,
    /// Timestamp of last canonical message
    pub last_message: DateTime<Utc>,
    /// Canonical message count
    pub message_count: usize,
    /// First user message (sanitized and truncated)
    pub preview_text: String,
    /// Path to the JSONL session file
    pub file_path: PathBuf,
    /// File size in bytes
    pub file_size: u64,
}

impl SessionSummary {
    /// Summarize a canonical sequence. Returns `None` for an empty session.
    pub fn from_messages(
        id: String,
        file_path: PathBuf,
        file_size: u64,
        messages: &[Message],
        preview_chars: usize,
    ) -> Option<Self> {
        let first = messages.first()?;
        let last = messages.last().unwrap_or(first);

        let preview_text = messages
            .iter()
            .filter(|m| m.role == Role::User)
            .map(|m| m.content.text())
            .find(|text| !text.trim().is_empty())
            .map(|text| preview(text, preview_chars))
            .unwrap_or_default();

        Some(Self {
            id,
            first_message: first.sort_key(),
            last_message: last.sort_key(),
            message_count: messages.len(),
            preview_text,
            file_path,
            file_size,
        })
    }

    /// Get a display name for the session.
    pub fn display_name(&self) -> String {
        self.id.chars().take(8).collect()
    }

    /// Format the transcript file size, e.g. "12.3 KB".
    pub fn size_str(&self) -> String {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;

        if self.file_size >= MB {
            format!("{:.1} MB", self.file_size as f64 / MB as f64)
        } else if self.file_size >= KB {
            format!("{:.1} KB", self.file_size as f64 / KB as f64)
        } else {
            format!("{} B", self.file_size)
        }
    }

    /// Calculate approximate duration.
    pub fn duration(&self) -> chrono::Duration {
        self.last_message.signed_duration_since(self.first_message)
    }

    /// Format duration as human-readable string.
    pub fn duration_str(&self) -> String {
        let dur = self.duration();
        let hours = dur.num_hours();
        let minutes = dur.num_minutes() % 60;

        if hours > 0 {
            format!("{}h {}m", hours, minutes)
        } else if minutes > 0 {
            format!("{}m", minutes)
        } else {
            "< 1m".to_string()
        }
    }
}

/// Replace control characters with spaces and cut to `max_chars`.
fn preview(text: &str, max_chars: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let sanitized = sanitized.trim();
    if sanitized.chars().count() > max_chars {
        let cut: String = sanitized.chars().take(max_chars).collect();
        format!("{}...", cut)
    } else {
        sanitized.to_string()
    }
}
