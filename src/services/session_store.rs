//! Session store - discovers and canonicalizes transcript files.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::canonical::decode_and_canonicalize_with;
use crate::config::Config;
use crate::models::{Message, SessionSummary};

/// A project directory and the sessions found in it.
#[derive(Debug, Clone)]
pub struct Project {
    /// Encoded directory name, e.g. "-home-user-projects-app"
    pub encoded_path: String,
    /// Best-effort readable path, e.g. "/home/user/projects/app"
    pub label: String,
    pub session_count: usize,
    pub total_messages: usize,
    pub last_activity: chrono::DateTime<chrono::Utc>,
}

/// Service for discovering and loading transcripts.
pub struct SessionStore {
    config: Arc<Config>,
    /// Projects, most recently active first
    projects: Vec<Project>,
    /// Sessions by project encoded path
    sessions: HashMap<String, Vec<SessionSummary>>,
}

impl SessionStore {
    /// Create a new session store.
    pub fn new(config: Arc<Config>) -> Self {
        Self {
            config,
            projects: Vec::new(),
            sessions: HashMap::new(),
        }
    }

    /// Scan for all projects and their sessions.
    pub fn scan(&mut self) -> Result<()> {
        let projects_dir = self.config.claude_projects_dir();
        self.projects.clear();
        self.sessions.clear();

        if !projects_dir.exists() {
            debug!(dir = %projects_dir.display(), "projects directory missing");
            return Ok(());
        }

        let entries = fs::read_dir(&projects_dir)
            .with_context(|| format!("reading {}", projects_dir.display()))?;

        for entry in entries {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }

            let encoded_path = match path.file_name().and_then(|n| n.to_str()) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => continue,
            };

            let sessions = self.load_project_sessions(&path);
            if sessions.is_empty() {
                continue;
            }

            let project = Project {
                label: project_label(&encoded_path),
                session_count: sessions.len(),
                total_messages: sessions.iter().map(|s| s.message_count).sum(),
                last_activity: sessions
                    .iter()
                    .map(|s| s.last_message)
                    .max()
                    .unwrap_or(chrono::DateTime::<chrono::Utc>::MIN_UTC),
                encoded_path: encoded_path.clone(),
            };

            self.sessions.insert(encoded_path, sessions);
            self.projects.push(project);
        }

        self.projects
            .sort_by(|a, b| b.last_activity.cmp(&a.last_activity));

        Ok(())
    }

    /// Summarize every `.jsonl` file directly inside a project directory.
    fn load_project_sessions(&self, project_dir: &Path) -> Vec<SessionSummary> {
        let mut sessions = Vec::new();

        for entry in WalkDir::new(project_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("jsonl") {
                continue;
            }

            match self.summarize(path) {
                Ok(Some(summary)) => sessions.push(summary),
                Ok(None) => debug!(file = %path.display(), "no messages in session"),
                Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable session"),
            }
        }

        sessions.sort_by(|a, b| b.last_message.cmp(&a.last_message));
        sessions
    }

    fn summarize(&self, path: &Path) -> Result<Option<SessionSummary>> {
        let file_size = fs::metadata(path)?.len();
        let messages = self.load_session(path)?;
        let session_id = path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(SessionSummary::from_messages(
            session_id,
            path.to_path_buf(),
            file_size,
            &messages,
            self.config.display.preview_chars,
        ))
    }

    /// Read one transcript file and return its canonical sequence.
    ///
    /// Invalid UTF-8 is replaced rather than rejected; a torn multi-byte
    /// character only spoils the line it sits on.
    pub fn load_session(&self, path: &Path) -> Result<Vec<Message>> {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(decode_and_canonicalize_with(&text, &self.config.canon.options()))
    }

    /// Get all discovered projects.
    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    /// Get sessions for a specific project.
    pub fn sessions_for_project(&self, encoded_path: &str) -> Option<&Vec<SessionSummary>> {
        self.sessions.get(encoded_path)
    }

    /// Find a session file by id across all projects.
    pub fn find_session(&self, session_id: &str) -> Option<PathBuf> {
        self.sessions
            .values()
            .flatten()
            .find(|s| s.id == session_id)
            .map(|s| s.file_path.clone())
    }

    /// Get total session count across all projects.
    pub fn total_session_count(&self) -> usize {
        self.sessions.values().map(|s| s.len()).sum()
    }
}

/// Readable form of an encoded project directory name.
///
/// The encoding maps `/` to `-`, so hyphens in real names come back as
/// slashes; good enough for a label.
pub fn project_label(encoded: &str) -> String {
    encoded.replace('-', "/")
}
