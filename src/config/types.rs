//! Configuration type definitions and defaults

use serde::{Deserialize, Serialize};

use crate::scanner::{
    DEFAULT_CACHE_MAX_BYTES, DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL,
    DEFAULT_EXTRACTOR_TIMEOUT, DEFAULT_MAX_TRANSCRIPT_BYTES,
};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub state: StateConfig,
}

/// Scan limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Transcripts larger than this are skipped
    #[serde(default = "default_max_transcript_bytes")]
    pub max_transcript_bytes: u64,
    /// Deadline for each extractor
    #[serde(default = "default_extractor_timeout_ms")]
    pub extractor_timeout_ms: u64,
}

pub fn default_max_transcript_bytes() -> u64 {
    DEFAULT_MAX_TRANSCRIPT_BYTES
}

pub fn default_extractor_timeout_ms() -> u64 {
    DEFAULT_EXTRACTOR_TIMEOUT.as_millis() as u64
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_transcript_bytes: default_max_transcript_bytes(),
            extractor_timeout_ms: default_extractor_timeout_ms(),
        }
    }
}

/// In-process result cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_ttl_ms")]
    pub ttl_ms: u64,
    #[serde(default = "default_cache_max_entries")]
    pub max_entries: usize,
    #[serde(default = "default_cache_max_bytes")]
    pub max_bytes: usize,
}

pub fn default_cache_ttl_ms() -> u64 {
    DEFAULT_CACHE_TTL.as_millis() as u64
}

pub fn default_cache_max_entries() -> usize {
    DEFAULT_CACHE_MAX_ENTRIES
}

pub fn default_cache_max_bytes() -> usize {
    DEFAULT_CACHE_MAX_BYTES
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_cache_ttl_ms(),
            max_entries: default_cache_max_entries(),
            max_bytes: default_cache_max_bytes(),
        }
    }
}

/// Persisted scan state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_state_directory")]
    pub directory: String,
}

pub fn default_state_directory() -> String {
    "~/.cache/tscan/sessions".to_string()
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            directory: default_state_directory(),
        }
    }
}
