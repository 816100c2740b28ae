//! Test helper utilities

#![allow(dead_code)]

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tscan::{ExtractorRegistry, Scanner, ScannerOptions};

/// Get the path to the fixtures directory
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

/// Load a fixture file's contents
pub fn load_fixture(name: &str) -> String {
    let path = fixtures_dir().join(name);
    fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load fixture: {}", name))
}

/// A temp directory holding one transcript and one state directory.
pub struct Workspace {
    pub temp: TempDir,
    pub transcript: PathBuf,
    pub state_dir: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let transcript = temp.path().join("transcript.jsonl");
        let state_dir = temp.path().join("state");
        Self {
            temp,
            transcript,
            state_dir,
        }
    }

    /// Workspace whose transcript starts as a copy of a fixture
    pub fn with_fixture(name: &str) -> Self {
        let ws = Self::new();
        fs::write(&ws.transcript, load_fixture(name)).expect("Failed to write transcript");
        ws
    }

    /// Replace the transcript contents
    pub fn write(&self, contents: &str) {
        fs::write(&self.transcript, contents).expect("Failed to write transcript");
    }

    /// Append to the transcript, returning the number of bytes appended
    pub fn append(&self, contents: &str) -> u64 {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.transcript)
            .expect("Failed to open transcript");
        file.write_all(contents.as_bytes())
            .expect("Failed to append to transcript");
        contents.len() as u64
    }

    /// Options with the result cache disabled, so every scan hits the file
    pub fn uncached_options(&self) -> ScannerOptions {
        let mut options = ScannerOptions::new(&self.state_dir);
        options.cache_ttl = Duration::ZERO;
        options
    }

    pub fn scanner(&self) -> Scanner {
        Scanner::with_defaults(self.uncached_options())
    }

    pub fn cached_scanner(&self) -> Scanner {
        Scanner::with_defaults(ScannerOptions::new(&self.state_dir))
    }

    pub fn scanner_with(&self, registry: ExtractorRegistry, timeout: Duration) -> Scanner {
        let mut options = self.uncached_options();
        options.extractor_timeout = timeout;
        Scanner::new(options, Arc::new(registry))
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }
}

/// One JSONL line for a flat human message
pub fn human(text: &str, timestamp: i64) -> String {
    serde_json::json!({"role": "human", "text": text, "timestamp": timestamp}).to_string() + "\n"
}

/// One JSONL line for a flat assistant message
pub fn assistant(text: &str, timestamp: i64) -> String {
    serde_json::json!({"role": "assistant", "text": text, "timestamp": timestamp}).to_string()
        + "\n"
}
