//! Short-lived in-process cache of scan results.
//!
//! A status line may redraw several times a second; within the TTL the same
//! session's result is served without touching the filesystem. Entries are
//! bounded both by count and by an approximate byte size, evicting the
//! soonest-to-expire entries first.

use std::collections::HashMap;
use std::mem::size_of;
use std::time::{Duration, Instant};

use tracing::debug;

use super::types::{AuthChange, Command, ScanResult, Secret};

struct CacheEntry {
    result: ScanResult,
    expires_at: Instant,
    size: usize,
}

/// Bounded TTL map from session id to its latest [`ScanResult`].
pub struct ResultCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
    max_entries: usize,
    max_bytes: usize,
    total_bytes: usize,
}

impl ResultCache {
    pub fn new(ttl: Duration, max_entries: usize, max_bytes: usize) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            max_entries,
            max_bytes,
            total_bytes: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Unexpired result for a session. An expired entry is evicted.
    pub fn get(&mut self, session_id: &str) -> Option<ScanResult> {
        self.get_at(session_id, Instant::now())
    }

    pub fn get_at(&mut self, session_id: &str, now: Instant) -> Option<ScanResult> {
        let expired = match self.entries.get(session_id) {
            None => return None,
            Some(entry) => entry.expires_at <= now,
        };
        if expired {
            self.invalidate(session_id);
            return None;
        }
        self.entries.get(session_id).map(|e| e.result.clone())
    }

    /// Store a result, replacing any previous one for the session.
    ///
    /// A result larger than the byte budget on its own is not cached.
    pub fn set(&mut self, session_id: &str, result: ScanResult) {
        self.set_at(session_id, result, Instant::now());
    }

    pub fn set_at(&mut self, session_id: &str, result: ScanResult, now: Instant) {
        if self.ttl.is_zero() || self.max_entries == 0 {
            return;
        }

        let size = estimate_size(&result);
        if size > self.max_bytes {
            debug!(session_id, size, "scan result too large to cache");
            self.invalidate(session_id);
            return;
        }

        self.invalidate(session_id);
        self.entries.insert(
            session_id.to_string(),
            CacheEntry {
                result,
                expires_at: now + self.ttl,
                size,
            },
        );
        self.total_bytes += size;
        self.evict_over_budget();
    }

    pub fn invalidate(&mut self, session_id: &str) {
        if let Some(entry) = self.entries.remove(session_id) {
            self.total_bytes -= entry.size;
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.total_bytes = 0;
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn cleanup(&mut self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.total_bytes = self.entries.values().map(|e| e.size).sum();
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Approximate bytes held by cached results.
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    fn evict_over_budget(&mut self) {
        while self.entries.len() > self.max_entries || self.total_bytes > self.max_bytes {
            let Some(victim) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            self.invalidate(&victim);
        }
    }
}

impl std::fmt::Debug for ResultCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("entries", &self.entries.len())
            .field("total_bytes", &self.total_bytes)
            .field("ttl", &self.ttl)
            .finish()
    }
}

/// Rough heap plus inline footprint of a result.
pub fn estimate_size(result: &ScanResult) -> usize {
    let secrets: usize = result
        .secrets
        .iter()
        .map(|s| size_of::<Secret>() + s.kind.len() + s.fingerprint.len() + s.redacted.len())
        .sum();
    let commands: usize = result
        .commands
        .iter()
        .map(|c| {
            size_of::<Command>()
                + c.name.len()
                + c.args
                    .iter()
                    .map(|a| size_of::<String>() + a.len())
                    .sum::<usize>()
        })
        .sum();
    let auth: usize = result
        .auth_changes
        .iter()
        .map(|a| size_of::<AuthChange>() + a.account.len())
        .sum();
    let metrics: usize = result
        .metrics
        .extractor_durations_us
        .keys()
        .chain(result.metrics.fallbacks.iter())
        .map(|k| size_of::<String>() + size_of::<u64>() + k.len())
        .sum();

    size_of::<ScanResult>() + result.last_message.preview.len() + secrets + commands + auth + metrics
}
