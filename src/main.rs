//! session-canon - canonical transcripts on the command line
//!
//! Reads a Claude Code session log (or a simplified/canonical JSON array),
//! prints the deduplicated, time-ordered message sequence as JSON, and lists
//! the sessions found under the Claude data directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read, Write};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use session_canon::config::Config;
use session_canon::services::SessionStore;
use session_canon::{extract_range, normalize_with, MissingIdPolicy, RangeBounds, SessionInput};

/// session-canon - Claude transcript canonicalizer
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Config file path (default: ~/.config/session-canon/config.toml)
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Claude directory path (default: ~/.claude)
    #[arg(long, global = true)]
    claude_dir: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the canonical message sequence of a transcript as JSON
    Canon {
        /// Transcript file, session id, or `-` for stdin
        input: String,

        /// Start at this message id (inclusive)
        #[arg(long)]
        from_id: Option<String>,

        /// Stop at this message id (inclusive)
        #[arg(long)]
        to_id: Option<String>,

        /// Keep at most this many messages
        #[arg(long)]
        limit: Option<usize>,

        /// Let records without a uuid share one dedup slot
        #[arg(long)]
        collapse_missing_ids: bool,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },
    /// List sessions under the Claude projects directory
    List,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging
    let filter = if args.debug {
        "session_canon=debug,info"
    } else {
        "session_canon=info,warn"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let mut config = if let Some(path) = &args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Override claude_dir if specified
    if let Some(claude_dir) = args.claude_dir {
        config.claude.claude_dir = claude_dir;
    }

    match args.command {
        Command::Canon {
            input,
            from_id,
            to_id,
            limit,
            collapse_missing_ids,
            pretty,
        } => {
            if collapse_missing_ids {
                config.canon.missing_ids = MissingIdPolicy::Collapse;
            }
            let bounds = RangeBounds {
                from_id,
                to_id,
                limit: limit.or(config.canon.default_limit),
            };
            canon(&config, &input, &bounds, pretty)
        }
        Command::List => list(&config),
    }
}

fn canon(config: &Config, input: &str, bounds: &RangeBounds, pretty: bool) -> Result<()> {
    let text = read_input(config, input)?;
    let parsed = SessionInput::from_text(text).context("classifying input")?;
    let messages = normalize_with(parsed, &config.canon.options());
    let messages = extract_range(&messages, bounds);
    info!(count = messages.len(), "canonical messages");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if pretty {
        serde_json::to_writer_pretty(&mut out, &messages)?;
    } else {
        serde_json::to_writer(&mut out, &messages)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Read stdin, a file path, or a session id resolved through the store.
fn read_input(config: &Config, input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = Vec::new();
        io::stdin().read_to_end(&mut buf).context("reading stdin")?;
        return Ok(String::from_utf8_lossy(&buf).into_owned());
    }

    let mut path = std::path::PathBuf::from(input);
    if !path.exists() {
        let mut store = SessionStore::new(Arc::new(config.clone()));
        store.scan()?;
        path = store
            .find_session(input)
            .with_context(|| format!("no file or session named {}", input))?;
    }

    let bytes = std::fs::read(&path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn list(config: &Config) -> Result<()> {
    let mut store = SessionStore::new(Arc::new(config.clone()));
    store.scan()?;

    let date_format = &config.display.date_format;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    for project in store.projects() {
        writeln!(
            out,
            "{}  ({} sessions, {} messages)",
            project.label, project.session_count, project.total_messages
        )?;
        for session in store
            .sessions_for_project(&project.encoded_path)
            .map(|s| s.as_slice())
            .unwrap_or_default()
        {
            writeln!(
                out,
                "  {}  {}  {:>4} msgs  {:>7}  {:>8}  {}",
                session.display_name(),
                session.last_message.format(date_format),
                session.message_count,
                session.duration_str(),
                session.size_str(),
                session.preview_text
            )?;
        }
    }

    info!(sessions = store.total_session_count(), "listed sessions");
    Ok(())
}
