//! CLI definitions for tscan
//!
//! This module contains the clap CLI structure definitions, separated from
//! main.rs so the command handlers and tests can share them.

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Parser, Subcommand};
use clap_complete::Shell as CompletionShell;
use std::path::PathBuf;

/// Build clap styles.
pub fn build_cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Green.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::White.on_default())
        .valid(AnsiColor::White.on_default())
        .invalid(AnsiColor::Red.on_default())
        .error(AnsiColor::Red.on_default() | Effects::BOLD)
}

#[derive(Parser)]
#[command(name = "tscan")]
#[command(about = "Incremental transcript scanner for agent status lines")]
#[command(long_about = "tscan - incremental transcript scanner for agent status lines.

Reads only what an AI coding agent appended to its JSONL transcript since the
last call and reports the latest human message, leaked secrets, slash
commands and account switches as JSON. Scan state is kept per session under
~/.cache/tscan/sessions/.

QUICK START:
    tscan scan <SESSION_ID> /abs/path/transcript.jsonl
    echo '{\"session_id\":\"abc\",\"transcript_path\":\"/abs/t.jsonl\"}' | tscan scan --stdin
    tscan state list

LOGGING:
    TSCAN_LOG=debug tscan scan ...    Log to stderr (default level: warn)")]
#[command(version)]
#[command(styles = build_cli_styles())]
pub struct Cli {
    /// Use this config file instead of ~/.config/tscan/config.toml
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Scan a session transcript and print the result as JSON
    #[command(long_about = "Scan a session transcript and print the result as JSON.

Only bytes appended since the previous scan of the same session are read.
Invalid input, a missing transcript or an oversized one print an empty result;
the command itself only fails when its arguments cannot be read.

EXAMPLES:
    tscan scan abc123 /home/me/.claude/projects/p/abc123.jsonl
    tscan scan --stdin --compact < hook-payload.json")]
    Scan {
        /// Session identifier ([A-Za-z0-9_-], at most 128 characters)
        #[arg(required_unless_present = "stdin")]
        session_id: Option<String>,
        /// Absolute path to the session's JSONL transcript
        #[arg(required_unless_present = "stdin")]
        transcript: Option<PathBuf>,
        /// Read {"session_id", "transcript_path"} JSON from stdin
        #[arg(long, conflicts_with_all = ["session_id", "transcript"])]
        stdin: bool,
        /// Print the result on one line
        #[arg(long)]
        compact: bool,
    },

    /// Inspect persisted scan state
    #[command(subcommand)]
    State(StateCommands),

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: CompletionShell,
    },
}

#[derive(Subcommand)]
pub enum StateCommands {
    /// List sessions with saved state
    List,
    /// Print a session's saved state as JSON (legacy files are shown
    /// migrated, never rewritten)
    Show {
        /// Session identifier
        session_id: String,
    },
    /// Delete a session's saved state, legacy files included
    Delete {
        /// Session identifier
        session_id: String,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}
