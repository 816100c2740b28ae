//! tscan - CLI entry point

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use std::io;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands, ConfigCommands, StateCommands};

/// Environment variable holding the log filter, e.g. `TSCAN_LOG=debug`.
const LOG_ENV: &str = "TSCAN_LOG";

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays parseable JSON
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Scan {
            session_id,
            transcript,
            stdin,
            compact,
        } => commands::scan::handle(config_path, session_id, transcript, stdin, compact),
        Commands::State(cmd) => match cmd {
            StateCommands::List => commands::state::handle_list(config_path),
            StateCommands::Show { session_id } => {
                commands::state::handle_show(config_path, &session_id)
            }
            StateCommands::Delete { session_id } => {
                commands::state::handle_delete(config_path, &session_id)
            }
        },
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::config::handle_show(config_path),
            ConfigCommands::Path => commands::config::handle_path(config_path),
        },
        Commands::Completions { shell } => commands::completions::handle::<Cli>(shell),
    }
}
