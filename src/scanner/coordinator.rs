//! The scanner entry point.
//!
//! [`Scanner::scan`] ties the pieces together: validation, the result cache,
//! the state store, the incremental reader, the parser and the concurrent
//! extractor run. It never fails; every problem degrades to a partial or
//! empty [`ScanResult`] and a log line.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::cache::ResultCache;
use super::executor::{run_extractors, ExtractorRun, RunOutcome};
use super::extractor::{Extractor, ExtractorOutput, ExtractorRegistry};
use super::parser::{committed_len, parse_lines};
use super::reader::read_incremental;
use super::state::{ExtractorRecord, ScanState, StateStore};
use super::types::{HealthInfo, ParsedLine, ScanResult};
use super::validate::{validate_session_id, validate_transcript_path};

pub const DEFAULT_MAX_TRANSCRIPT_BYTES: u64 = 50 * 1024 * 1024;
pub const DEFAULT_EXTRACTOR_TIMEOUT: Duration = Duration::from_millis(250);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 32;
pub const DEFAULT_CACHE_MAX_BYTES: usize = 1024 * 1024;

/// Runtime knobs for a [`Scanner`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerOptions {
    /// Transcripts larger than this are not read at all.
    pub max_transcript_bytes: u64,
    /// Per-extractor deadline.
    pub extractor_timeout: Duration,
    /// How long a result is served from the in-process cache.
    pub cache_ttl: Duration,
    pub cache_max_entries: usize,
    pub cache_max_bytes: usize,
    /// Where per-session state files live.
    pub state_dir: PathBuf,
}

impl ScannerOptions {
    /// Defaults for everything except the state directory.
    pub fn new(state_dir: impl Into<PathBuf>) -> Self {
        Self {
            max_transcript_bytes: DEFAULT_MAX_TRANSCRIPT_BYTES,
            extractor_timeout: DEFAULT_EXTRACTOR_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            cache_max_bytes: DEFAULT_CACHE_MAX_BYTES,
            state_dir: state_dir.into(),
        }
    }
}

/// Incremental transcript scanner.
///
/// Cheap to share: `scan` takes `&self`, and the only interior mutability is
/// the result cache behind a mutex.
pub struct Scanner {
    options: ScannerOptions,
    registry: Arc<ExtractorRegistry>,
    store: StateStore,
    cache: Mutex<ResultCache>,
}

impl std::fmt::Debug for Scanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scanner")
            .field("options", &self.options)
            .field("registry", &self.registry)
            .finish()
    }
}

/// Extractor outputs gathered for one scan.
struct Collected {
    outputs: Vec<ExtractorOutput>,
    records: BTreeMap<String, ExtractorRecord>,
    durations_us: BTreeMap<String, u64>,
    fallbacks: Vec<String>,
}

impl Scanner {
    pub fn new(options: ScannerOptions, registry: Arc<ExtractorRegistry>) -> Self {
        let store = StateStore::new(options.state_dir.clone());
        let cache = Mutex::new(ResultCache::new(
            options.cache_ttl,
            options.cache_max_entries,
            options.cache_max_bytes,
        ));
        Self {
            options,
            registry,
            store,
            cache,
        }
    }

    /// Scanner with the standard extractors.
    pub fn with_defaults(options: ScannerOptions) -> Self {
        Self::new(options, Arc::new(ExtractorRegistry::with_defaults()))
    }

    pub fn options(&self) -> &ScannerOptions {
        &self.options
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    pub fn state_store(&self) -> &StateStore {
        &self.store
    }

    /// Drop the cached result for a session so the next scan reads the file.
    pub fn invalidate(&self, session_id: &str) {
        self.cache().invalidate(session_id);
    }

    /// Drop every expired cache entry. Returns how many were removed.
    pub fn cleanup_cache(&self) -> usize {
        self.cache().cleanup()
    }

    /// Scan whatever was appended to a session's transcript since last time.
    ///
    /// Never fails: invalid input, a missing file or an oversized file yields
    /// an empty result, and a failing extractor yields its fallback output.
    pub fn scan(&self, session_id: &str, transcript_path: &Path) -> ScanResult {
        let started = Instant::now();

        if let Err(e) = validate_session_id(session_id)
            .and_then(|()| validate_transcript_path(transcript_path))
        {
            debug!(error = %e, "rejecting scan request");
            return ScanResult::empty();
        }

        if let Some(mut hit) = self.cache().get(session_id) {
            hit.metrics.cache_hit = true;
            return hit;
        }

        let metadata = match fs::metadata(transcript_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    session_id,
                    path = %transcript_path.display(),
                    error = %e,
                    "transcript unavailable"
                );
                return ScanResult::empty();
            }
        };
        if metadata.len() > self.options.max_transcript_bytes {
            warn!(
                session_id,
                size = metadata.len(),
                limit = self.options.max_transcript_bytes,
                "transcript too large to scan"
            );
            let mut result = ScanResult::empty();
            result.health.exists = true;
            result.health.size_bytes = metadata.len();
            return result;
        }

        let now_ms = chrono::Utc::now().timestamp_millis();
        let previous = self
            .store
            .load(session_id)
            .unwrap_or_else(|| StateStore::create_initial(now_ms));

        let read = match read_incremental(transcript_path, previous.last_offset, previous.last_mtime_ms)
        {
            Ok(read) => read,
            Err(e) => {
                warn!(session_id, error = %e, "failed to read transcript");
                return ScanResult::empty();
            }
        };

        // After truncation nothing persisted describes the current file
        let base = if read.truncated {
            StateStore::create_initial(now_ms)
        } else {
            previous
        };

        let committed = committed_len(&read.bytes);
        let lines = parse_lines(&read.bytes[..committed], base.line_count + 1);
        let lines_scanned = lines.len() as u64;

        let collected = self.run_pipeline(session_id, &base, lines, now_ms);
        let mut result = assemble(collected.outputs);

        result.health = HealthInfo {
            exists: true,
            size_bytes: read.size,
            modified_age_ms: (now_ms - read.mtime_ms).max(0),
            message_count: result.last_message.total_messages,
        };
        result.metrics.lines_scanned = lines_scanned;
        result.metrics.bytes_read = read.bytes.len() as u64;
        result.metrics.unchanged = read.unchanged;
        result.metrics.full_rescan = read.truncated;
        result.metrics.extractor_durations_us = collected.durations_us;
        result.metrics.fallbacks = collected.fallbacks;

        if !read.unchanged {
            let state = StateStore::update(
                &base,
                read.start_offset + committed as u64,
                read.mtime_ms,
                lines_scanned,
                collected.records,
                now_ms,
            );
            self.store.save(session_id, &state);
        }

        result.metrics.duration_ms = started.elapsed().as_millis() as u64;
        self.cache().set(session_id, result.clone());

        debug!(
            session_id,
            lines = lines_scanned,
            bytes = result.metrics.bytes_read,
            duration_ms = result.metrics.duration_ms,
            "scan complete"
        );
        result
    }

    fn run_pipeline(
        &self,
        session_id: &str,
        base: &ScanState,
        lines: Vec<ParsedLine>,
        now_ms: i64,
    ) -> Collected {
        let runs: Vec<ExtractorRun> = if lines.is_empty() {
            // Nothing new: every extractor would return its empty value
            self.registry
                .iter()
                .map(|extractor| ExtractorRun {
                    id: extractor.id(),
                    outcome: RunOutcome::Completed(extractor.empty()),
                    duration: Duration::ZERO,
                })
                .collect()
        } else {
            run_extractors(&self.registry, lines.into(), self.options.extractor_timeout)
        };

        let mut collected = Collected {
            outputs: Vec::with_capacity(runs.len()),
            records: BTreeMap::new(),
            durations_us: BTreeMap::new(),
            fallbacks: Vec::new(),
        };

        for (extractor, run) in self.registry.iter().zip(runs) {
            let id = extractor.id();
            collected
                .durations_us
                .insert(id.to_string(), run.duration.as_micros() as u64);

            let output = match run.outcome {
                RunOutcome::Completed(fresh) => {
                    if !extractor.persist() {
                        fresh
                    } else {
                        let output = match base.record(id) {
                            Some(record) => extractor.merge(record.output.clone(), fresh),
                            None => fresh,
                        };
                        collected.records.insert(
                            id.to_string(),
                            ExtractorRecord {
                                output: output.clone(),
                                updated_ms: now_ms,
                            },
                        );
                        output
                    }
                }
                RunOutcome::TimedOut => {
                    warn!(session_id, extractor = id, "extractor timed out, using fallback");
                    collected.fallbacks.push(id.to_string());
                    fallback(extractor.as_ref(), base, now_ms)
                }
                RunOutcome::Failed(reason) => {
                    warn!(session_id, extractor = id, %reason, "extractor failed, using fallback");
                    collected.fallbacks.push(id.to_string());
                    fallback(extractor.as_ref(), base, now_ms)
                }
            };
            collected.outputs.push(output);
        }

        collected
    }

    fn cache(&self) -> MutexGuard<'_, ResultCache> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Persisted output still within the extractor's TTL, else its empty value.
///
/// The persisted record itself is left untouched, so its timestamp keeps
/// aging across repeated fallbacks.
fn fallback(extractor: &dyn Extractor, base: &ScanState, now_ms: i64) -> ExtractorOutput {
    let fresh_enough = |record: &&ExtractorRecord| match extractor.cache_ttl() {
        Some(ttl) => now_ms.saturating_sub(record.updated_ms) <= ttl.as_millis() as i64,
        None => true,
    };
    base.record(extractor.id())
        .filter(fresh_enough)
        .map(|record| record.output.clone())
        .unwrap_or_else(|| extractor.empty())
}

fn assemble(outputs: Vec<ExtractorOutput>) -> ScanResult {
    let mut result = ScanResult::empty();
    for output in outputs {
        match output {
            ExtractorOutput::LastMessage(message) => result.last_message = message,
            ExtractorOutput::Secrets(secrets) => result.secrets = secrets,
            ExtractorOutput::Commands(commands) => result.commands = commands,
            ExtractorOutput::AuthChanges(changes) => result.auth_changes = changes,
        }
    }
    result
}

