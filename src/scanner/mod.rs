//! Incremental transcript scanning.
//!
//! A status line asks "what happened in this agent session?" every few
//! hundred milliseconds. The [`Scanner`] answers by reading only the bytes
//! appended to the session's JSONL transcript since the previous scan, running
//! a set of [`Extractor`]s over the new lines, and folding their output into
//! state persisted per session.
//!
//! ```text
//! Scanner::scan
//!   -> ResultCache (hit: return)
//!   -> StateStore::load (legacy files migrated on first sight)
//!   -> read_incremental -> parse_lines
//!   -> run_extractors (one thread each, per-extractor deadline)
//!   -> StateStore::save -> ResultCache::set
//! ```
//!
//! # Concurrency
//!
//! There is no cross-process lock. Several processes may scan the same
//! session at once; reads are driven by size and mtime, saves are atomic
//! renames, and the last writer wins. A losing writer's progress is simply
//! re-scanned later, so the worst case is duplicate work, and line numbers
//! may drift under concurrent writers.

pub mod cache;
mod coordinator;
pub mod error;
pub mod executor;
mod extractor;
pub mod extractors;
pub mod parser;
pub mod reader;
pub mod state;
pub mod types;
pub mod validate;

pub use cache::ResultCache;
pub use coordinator::{
    Scanner, ScannerOptions, DEFAULT_CACHE_MAX_BYTES, DEFAULT_CACHE_MAX_ENTRIES,
    DEFAULT_CACHE_TTL, DEFAULT_EXTRACTOR_TIMEOUT, DEFAULT_MAX_TRANSCRIPT_BYTES,
};
pub use error::{ReadError, StateError, ValidationError};
pub use extractor::{Extractor, ExtractorOutput, ExtractorRegistry};
pub use state::{ExtractorRecord, ScanState, StateStore, STATE_VERSION};
pub use types::{
    AuthChange, Command, HealthInfo, MessageInfo, ParsedLine, ScanMetrics, ScanResult, Secret,
    SenderRole,
};
