//! Per-session scan state on disk.
//!
//! One JSON file per session under the state directory holds the read
//! position and the last-known output of every persisted extractor. Saves go
//! through a temp file and a rename so a reader never observes a partially
//! written file; concurrent writers for the same session resolve as
//! last-writer-wins.

mod legacy;

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::StateError;
use super::extractor::ExtractorOutput;
use super::validate::validate_session_id;

pub use legacy::{LEGACY_LAST_MESSAGE_PREFIX, LEGACY_SECRETS_PREFIX};

/// Schema version written by this build. Files with any other version are
/// ignored.
pub const STATE_VERSION: u32 = 1;

/// Distinguishes temp files of concurrent saves within one process.
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Last-known output of one extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractorRecord {
    pub output: ExtractorOutput,
    /// Unix milliseconds when `output` was produced.
    pub updated_ms: i64,
}

/// Everything remembered about a session between scans.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanState {
    pub version: u32,
    /// Bytes of the transcript already consumed.
    pub last_offset: u64,
    /// Transcript mtime observed at `last_offset`.
    pub last_mtime_ms: i64,
    pub last_scan_ms: i64,
    /// Non-blank lines consumed so far; the next line is `line_count + 1`.
    #[serde(default)]
    pub line_count: u64,
    #[serde(default)]
    pub extractors: BTreeMap<String, ExtractorRecord>,
}

impl ScanState {
    pub fn record(&self, extractor_id: &str) -> Option<&ExtractorRecord> {
        self.extractors.get(extractor_id)
    }
}

/// Loads and saves [`ScanState`] files in a single directory.
#[derive(Debug, Clone)]
pub struct StateStore {
    dir: PathBuf,
}

impl StateStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the current-schema file. Does not validate `session_id`.
    pub fn state_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", session_id))
    }

    /// Load the state for a session, migrating legacy files if that is all
    /// there is.
    ///
    /// Returns `None` for an invalid id (without touching the filesystem),
    /// a missing file, a version mismatch or an unreadable file.
    pub fn load(&self, session_id: &str) -> Option<ScanState> {
        match self.read(session_id)? {
            Stored::Current(state) => state,
            Stored::Migrated(state) => {
                self.save(session_id, &state);
                Some(state)
            }
        }
    }

    /// Like [`load`](Self::load), but never writes: migrated legacy state is
    /// returned without being saved.
    pub fn peek(&self, session_id: &str) -> Option<ScanState> {
        match self.read(session_id)? {
            Stored::Current(state) => state,
            Stored::Migrated(state) => Some(state),
        }
    }

    fn read(&self, session_id: &str) -> Option<Stored> {
        if let Err(e) = validate_session_id(session_id) {
            debug!(error = %e, "refusing to load state for invalid session id");
            return None;
        }

        let path = self.state_path(session_id);
        match fs::read(&path) {
            Ok(bytes) => return Some(Stored::Current(decode(&bytes, &path))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to read scan state");
                return None;
            }
        }

        let migrated = legacy::migrate(&self.dir, session_id)?;
        debug!(
            session_id,
            offset = migrated.last_offset,
            "migrated legacy scan state"
        );
        Some(Stored::Migrated(migrated))
    }

    /// Atomically write the state for a session.
    ///
    /// Failures are logged and reported as `false`; the previous file, if
    /// any, is left intact.
    pub fn save(&self, session_id: &str, state: &ScanState) -> bool {
        match self.try_save(session_id, state) {
            Ok(()) => true,
            Err(e) => {
                warn!(session_id, error = %e, "failed to save scan state");
                false
            }
        }
    }

    fn try_save(&self, session_id: &str, state: &ScanState) -> Result<(), StateError> {
        validate_session_id(session_id)?;
        let encoded = serde_json::to_vec_pretty(state)?;

        create_private_dir(&self.dir).map_err(|e| StateError::io(&self.dir, e))?;

        let final_path = self.state_path(session_id);
        let temp_path = self.dir.join(format!(
            "{}.json.{}.{}.tmp",
            session_id,
            std::process::id(),
            TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed)
        ));

        if let Err(e) = write_private(&temp_path, &encoded) {
            let _ = fs::remove_file(&temp_path);
            return Err(StateError::io(&temp_path, e));
        }

        if let Err(e) = fs::rename(&temp_path, &final_path) {
            // Clean up temp file on failure
            let _ = fs::remove_file(&temp_path);
            return Err(StateError::io(&final_path, e));
        }

        Ok(())
    }

    /// Fresh state positioned at the start of the transcript.
    pub fn create_initial(now_ms: i64) -> ScanState {
        ScanState {
            version: STATE_VERSION,
            last_offset: 0,
            last_mtime_ms: 0,
            last_scan_ms: now_ms,
            line_count: 0,
            extractors: BTreeMap::new(),
        }
    }

    /// Advance `previous` past a scanned window.
    ///
    /// `records` replace the entries with the same id; entries for other
    /// extractors are carried over unchanged.
    pub fn update(
        previous: &ScanState,
        new_offset: u64,
        new_mtime_ms: i64,
        lines_scanned: u64,
        records: BTreeMap<String, ExtractorRecord>,
        now_ms: i64,
    ) -> ScanState {
        let mut extractors = previous.extractors.clone();
        extractors.extend(records);
        ScanState {
            version: STATE_VERSION,
            last_offset: new_offset,
            last_mtime_ms: new_mtime_ms,
            last_scan_ms: now_ms,
            line_count: previous.line_count + lines_scanned,
            extractors,
        }
    }

    /// Remove every file kept for a session, legacy ones included.
    ///
    /// Returns whether anything was removed.
    pub fn delete(&self, session_id: &str) -> Result<bool, StateError> {
        validate_session_id(session_id)?;

        let mut removed = false;
        let paths = std::iter::once(self.state_path(session_id))
            .chain(legacy::paths(&self.dir, session_id));
        for path in paths {
            match fs::remove_file(&path) {
                Ok(()) => removed = true,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(StateError::io(&path, e)),
            }
        }
        Ok(removed)
    }

    /// Session ids with a current-schema state file, sorted.
    pub fn list_sessions(&self) -> Result<Vec<String>, StateError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StateError::io(&self.dir, e)),
        };

        let mut sessions: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let id = name.strip_suffix(".json")?;
                // Also skips legacy files, whose names carry a reserved prefix
                if validate_session_id(id).is_err() {
                    return None;
                }
                Some(id.to_string())
            })
            .collect();
        sessions.sort();
        Ok(sessions)
    }
}

/// Where a loaded state came from. A current-schema file that fails to
/// decode is still `Current`, so legacy files never shadow it.
enum Stored {
    Current(Option<ScanState>),
    Migrated(ScanState),
}

fn decode(bytes: &[u8], path: &Path) -> Option<ScanState> {
    match serde_json::from_slice::<ScanState>(bytes) {
        Ok(state) if state.version == STATE_VERSION => Some(state),
        Ok(state) => {
            debug!(
                path = %path.display(),
                version = state.version,
                "ignoring scan state with unsupported version"
            );
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "ignoring corrupt scan state");
            None
        }
    }
}

#[cfg(unix)]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o700).create(dir)
}

#[cfg(not(unix))]
fn create_private_dir(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)
}

fn write_private(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(contents)?;
    file.sync_all()
}
