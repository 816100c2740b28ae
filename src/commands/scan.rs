//! Scan command handler

use anyhow::{Context, Result};
use serde::Deserialize;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use tscan::Scanner;

use super::{load_config, print_json};

/// Payload a status line hook writes to stdin. Unknown fields are ignored.
#[derive(Debug, Deserialize)]
struct HookPayload {
    session_id: String,
    transcript_path: PathBuf,
}

/// Handle the scan command.
#[cfg(not(tarpaulin_include))]
pub fn handle(
    config_path: Option<&Path>,
    session_id: Option<String>,
    transcript: Option<PathBuf>,
    stdin: bool,
    compact: bool,
) -> Result<()> {
    let config = load_config(config_path)?;

    let (session_id, transcript) = if stdin {
        read_payload(io::stdin().lock())?
    } else {
        (
            session_id.context("Missing session id")?,
            transcript.context("Missing transcript path")?,
        )
    };

    let scanner = Scanner::with_defaults(config.scanner_options());
    let result = scanner.scan(&session_id, &transcript);
    print_json(&result, compact)
}

/// Read the session id and transcript path from a hook payload.
pub(crate) fn read_payload(mut reader: impl Read) -> Result<(String, PathBuf)> {
    let mut raw = String::new();
    reader
        .read_to_string(&mut raw)
        .context("Failed to read payload from stdin")?;
    let payload: HookPayload =
        serde_json::from_str(&raw).context("Failed to parse payload from stdin")?;
    Ok((payload.session_id, payload.transcript_path))
}
