//! Migration from the single-purpose state files of older releases.
//!
//! Each legacy format lives in its own file and exposes a `convert` function
//! turning the raw file contents into a [`LegacyFragment`]. When several
//! legacy files exist for one session they are folded into a single
//! [`ScanState`] positioned at the smallest offset, so no extractor misses
//! data it never saw.
//!
//! Legacy files are left in place after migration; the current-schema file
//! takes precedence once it exists.

mod last_message;
mod secrets;

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::warn;

use super::{ExtractorRecord, ScanState, STATE_VERSION};
use crate::scanner::extractor::ExtractorOutput;

pub const LEGACY_LAST_MESSAGE_PREFIX: &str = "last-message-";
pub const LEGACY_SECRETS_PREFIX: &str = "secrets-";

/// What one legacy file contributes to the unified state.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct LegacyFragment {
    pub offset: u64,
    pub mtime_ms: i64,
    pub extractor_id: &'static str,
    pub output: ExtractorOutput,
}

type Convert = fn(&[u8]) -> Result<LegacyFragment, serde_json::Error>;

/// Known legacy formats as (file name prefix, converter).
#[rustfmt::skip]
const LEGACY_FORMATS: &[(&str, Convert)] = &[
    (LEGACY_LAST_MESSAGE_PREFIX, last_message::convert),
    (LEGACY_SECRETS_PREFIX, secrets::convert),
];

/// Every legacy path that may exist for a session.
pub(super) fn paths<'a>(dir: &'a Path, session_id: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
    LEGACY_FORMATS
        .iter()
        .map(move |(prefix, _)| legacy_path(dir, prefix, session_id))
}

fn legacy_path(dir: &Path, prefix: &str, session_id: &str) -> PathBuf {
    dir.join(format!("{}{}.json", prefix, session_id))
}

/// Build a unified state from whatever legacy files exist.
///
/// Unreadable or malformed legacy files are skipped with a warning.
pub(super) fn migrate(dir: &Path, session_id: &str) -> Option<ScanState> {
    let fragments: Vec<LegacyFragment> = LEGACY_FORMATS
        .iter()
        .filter_map(|&(prefix, convert)| {
            let path = legacy_path(dir, prefix, session_id);
            let bytes = match fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "failed to read legacy state");
                    return None;
                }
            };
            match convert(&bytes) {
                Ok(fragment) => Some(fragment),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "ignoring malformed legacy state");
                    None
                }
            }
        })
        .collect();

    merge(fragments)
}

fn merge(fragments: Vec<LegacyFragment>) -> Option<ScanState> {
    let earliest = fragments.iter().min_by_key(|f| f.offset)?;
    let last_offset = earliest.offset;
    let last_mtime_ms = earliest.mtime_ms;
    let last_scan_ms = fragments.iter().map(|f| f.mtime_ms).max().unwrap_or(0);

    let extractors: BTreeMap<String, ExtractorRecord> = fragments
        .into_iter()
        .map(|fragment| {
            (
                fragment.extractor_id.to_string(),
                ExtractorRecord {
                    output: fragment.output,
                    updated_ms: fragment.mtime_ms,
                },
            )
        })
        .collect();

    Some(ScanState {
        version: STATE_VERSION,
        last_offset,
        last_mtime_ms,
        last_scan_ms,
        // Older formats did not track line numbers
        line_count: 0,
        extractors,
    })
}

/// Legacy writers stored `mtimeMs`, which may carry a fractional part.
fn mtime_to_ms(mtime: f64) -> i64 {
    if mtime.is_finite() && mtime > 0.0 {
        mtime as i64
    } else {
        0
    }
}
