//! Configuration management for tscan
//!
//! Values come from `~/.config/tscan/config.toml` (every key optional), then
//! a few `TSCAN_*` environment variables override them.

mod io;
mod types;

pub use types::*;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::scanner::ScannerOptions;

/// Overrides `[state].directory`
pub const ENV_STATE_DIR: &str = "TSCAN_STATE_DIR";
/// Overrides `[cache].ttl_ms`
pub const ENV_CACHE_TTL_MS: &str = "TSCAN_CACHE_TTL_MS";
/// Overrides `[scanner].extractor_timeout_ms`
pub const ENV_EXTRACTOR_TIMEOUT_MS: &str = "TSCAN_EXTRACTOR_TIMEOUT_MS";

impl Config {
    /// Get the config file path (~/.config/tscan/config.toml)
    pub fn config_path() -> Result<PathBuf> {
        io::config_path()
    }

    /// Get the config directory path (~/.config/tscan)
    pub fn config_dir() -> Result<PathBuf> {
        io::config_dir()
    }

    /// Load configuration from file, or return defaults if not found.
    ///
    /// Environment overrides are applied on top.
    pub fn load() -> Result<Self> {
        let mut config = io::load()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path, then apply environment
    /// overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = io::load_from(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        io::to_toml(self)
    }

    /// Apply `TSCAN_*` overrides read through `lookup`.
    ///
    /// Unparseable numbers are ignored with a warning.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup(ENV_STATE_DIR).filter(|d| !d.trim().is_empty()) {
            self.state.directory = dir;
        }
        if let Some(ttl) = parse_override(&lookup, ENV_CACHE_TTL_MS) {
            self.cache.ttl_ms = ttl;
        }
        if let Some(timeout) = parse_override(&lookup, ENV_EXTRACTOR_TIMEOUT_MS) {
            self.scanner.extractor_timeout_ms = timeout;
        }
    }

    /// Expand ~ in state directory path
    pub fn state_directory(&self) -> PathBuf {
        let dir = &self.state.directory;
        if let Some(home) = dirs::home_dir() {
            if dir == "~" {
                return home;
            }
            if let Some(stripped) = dir.strip_prefix("~/") {
                return home.join(stripped);
            }
        }
        PathBuf::from(dir)
    }

    /// Options for constructing a [`Scanner`](crate::Scanner).
    pub fn scanner_options(&self) -> ScannerOptions {
        ScannerOptions {
            max_transcript_bytes: self.scanner.max_transcript_bytes,
            extractor_timeout: Duration::from_millis(self.scanner.extractor_timeout_ms),
            cache_ttl: Duration::from_millis(self.cache.ttl_ms),
            cache_max_entries: self.cache.max_entries,
            cache_max_bytes: self.cache.max_bytes,
            state_dir: self.state_directory(),
        }
    }
}

fn parse_override(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = %raw, error = %e, "ignoring invalid environment override");
            None
        }
    }
}
