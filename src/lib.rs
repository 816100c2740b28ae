//! tscan - incremental transcript scanner for agent status lines
//!
//! Reads the JSONL transcript an AI coding agent writes, a few appended
//! bytes at a time, and reports the latest human message, leaked secrets,
//! slash commands and account switches.

pub mod config;
pub mod scanner;

pub use config::Config;
pub use scanner::{
    Extractor, ExtractorOutput, ExtractorRegistry, ScanResult, Scanner, ScannerOptions,
    StateStore,
};
