//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::canonical::{CanonOptions, MissingIdPolicy};

/// Main configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub claude: ClaudeConfig,
    #[serde(default)]
    pub canon: CanonConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Where transcripts live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaudeConfig {
    /// Path to Claude directory (default: ~/.claude)
    #[serde(default = "default_claude_dir")]
    pub claude_dir: String,
}

impl Default for ClaudeConfig {
    fn default() -> Self {
        Self {
            claude_dir: default_claude_dir(),
        }
    }
}

fn default_claude_dir() -> String {
    dirs::home_dir()
        .map(|h| h.join(".claude").to_string_lossy().to_string())
        .unwrap_or_else(|| "~/.claude".to_string())
}

/// Canonicalization settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanonConfig {
    /// How records without a `uuid` are handled
    #[serde(default)]
    pub missing_ids: MissingIdPolicy,
    /// Limit applied by `canon` when no `--limit` is given
    #[serde(default)]
    pub default_limit: Option<usize>,
}

impl CanonConfig {
    pub fn options(&self) -> CanonOptions {
        CanonOptions {
            missing_ids: self.missing_ids,
        }
    }
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// Maximum characters of preview text per session
    #[serde(default = "default_preview_chars")]
    pub preview_chars: usize,
    /// Date format string
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            preview_chars: default_preview_chars(),
            date_format: default_date_format(),
        }
    }
}

fn default_preview_chars() -> usize {
    200
}

fn default_date_format() -> String {
    "%m/%d %H:%M".to_string()
}

impl Config {
    /// Load configuration from default location.
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            Self::from_file(&config_path.to_string_lossy())
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file.
    pub fn from_file(path: &str) -> Result<Self> {
        let expanded = expand_path(path);
        let content = std::fs::read_to_string(&expanded)
            .with_context(|| format!("reading config {}", expanded))?;
        Self::from_toml(&content).with_context(|| format!("parsing config {}", expanded))
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the default config path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("session-canon")
            .join("config.toml")
    }

    /// Get the Claude projects directory.
    pub fn claude_projects_dir(&self) -> PathBuf {
        PathBuf::from(expand_path(&self.claude.claude_dir)).join("projects")
    }
}

/// Expand ~ to home directory.
pub fn expand_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest).to_string_lossy().to_string();
        }
    }
    path.to_string()
}
