//! Data types shared across the scanner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One non-blank transcript line, decoded or not.
///
/// Exactly one of `payload` and `error` is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// 1-based line number within the transcript.
    pub line_number: u64,
    /// The line text with the trailing newline removed.
    pub raw: String,
    /// Decoded JSON object.
    pub payload: Option<Value>,
    /// Why decoding failed.
    pub error: Option<String>,
}

/// Who authored a transcript entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderRole {
    Human,
    Assistant,
    #[default]
    Unknown,
}

/// Preview of the most recent human message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageInfo {
    /// Unix milliseconds, 0 when unknown.
    pub timestamp: i64,
    /// Whitespace-collapsed text, at most 80 characters.
    pub preview: String,
    pub sender: SenderRole,
    /// Count of human and assistant entries up to and including this one.
    pub turn_number: u64,
    /// Running total of human and assistant entries seen in the transcript.
    #[serde(default)]
    pub total_messages: u64,
}

impl MessageInfo {
    pub fn is_empty(&self) -> bool {
        self.preview.is_empty() && self.turn_number == 0
    }
}

/// A credential-shaped string found in the transcript.
///
/// Only the redacted form is kept; the matched value never leaves the
/// detector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    /// Pattern label, e.g. `github_token`.
    pub kind: String,
    /// `kind:hash-prefix`, stable for the same value.
    pub fingerprint: String,
    /// Approximate transcript line.
    pub line: u64,
    /// First and last four characters joined by `...`, or `****`.
    pub redacted: String,
}

/// A recognized slash command issued by the human.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    /// Command name including the leading slash, e.g. `/model`.
    pub name: String,
    pub timestamp: i64,
    pub args: Vec<String>,
    pub line: u64,
}

/// A confirmed login or account switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthChange {
    pub timestamp: i64,
    pub account: String,
    pub line: u64,
}

/// Transcript file health at scan time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInfo {
    pub exists: bool,
    pub size_bytes: u64,
    /// Milliseconds since the transcript was last modified.
    pub modified_age_ms: i64,
    /// Human and assistant entries seen so far.
    pub message_count: u64,
}

/// How the scan went.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanMetrics {
    pub duration_ms: u64,
    pub lines_scanned: u64,
    pub bytes_read: u64,
    /// Served from the in-process result cache.
    pub cache_hit: bool,
    /// The incremental read found nothing new.
    pub unchanged: bool,
    /// The transcript shrank and was rescanned from the start.
    pub full_rescan: bool,
    /// Per-extractor wall time in microseconds.
    pub extractor_durations_us: BTreeMap<String, u64>,
    /// Extractors whose output was replaced by a fallback this scan.
    pub fallbacks: Vec<String>,
}

/// Everything one scan produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub last_message: MessageInfo,
    pub secrets: Vec<Secret>,
    pub commands: Vec<Command>,
    pub auth_changes: Vec<AuthChange>,
    pub health: HealthInfo,
    pub metrics: ScanMetrics,
}

impl ScanResult {
    /// The result returned when nothing could be scanned.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Same result without the timing-dependent fields.
    ///
    /// Two scans of an unchanged transcript compare equal under this view.
    pub fn content(&self) -> (&MessageInfo, &[Secret], &[Command], &[AuthChange]) {
        (
            &self.last_message,
            &self.secrets,
            &self.commands,
            &self.auth_changes,
        )
    }
}
