//! Extractor capability contract and registry.
//!
//! Each extractor derives one signal from the lines read in a scan. The
//! coordinator only ever sees extractors as `Arc<dyn Extractor>`, so adding a
//! signal means implementing the trait and registering it; the coordinator
//! does not change.
//!
//! # Design
//!
//! Extractors are stateless and run concurrently on separate threads. They
//! see only the newly read window of lines. Signals that must survive across
//! scans (the last message, secrets already seen) implement [`Extractor::merge`]
//! to fold the fresh window into the previously persisted output.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::extractors::{
    AuthChangeExtractor, CommandExtractor, LastMessageExtractor, SecretExtractor,
};
use super::types::{AuthChange, Command, MessageInfo, ParsedLine, Secret};

/// Typed output of one extractor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum ExtractorOutput {
    LastMessage(MessageInfo),
    Secrets(Vec<Secret>),
    Commands(Vec<Command>),
    AuthChanges(Vec<AuthChange>),
}

/// A pluggable transcript analyzer.
///
/// Implementors must be thread-safe: each scan runs every extractor on its
/// own thread.
pub trait Extractor: Send + Sync {
    /// Unique identifier; also the key under which output is persisted.
    fn id(&self) -> &'static str;

    /// Whether output is stored in the session state for reuse.
    fn persist(&self) -> bool;

    /// How long persisted output may stand in for a failed or timed-out run.
    ///
    /// `None` means no limit.
    fn cache_ttl(&self) -> Option<Duration> {
        None
    }

    /// The defined empty value.
    fn empty(&self) -> ExtractorOutput;

    /// Analyze the newly read lines.
    ///
    /// Must not panic; internal failures return [`Extractor::empty`].
    fn extract(&self, lines: &[ParsedLine]) -> ExtractorOutput;

    /// Fold a fresh window's output into the previously persisted output.
    fn merge(&self, _previous: ExtractorOutput, fresh: ExtractorOutput) -> ExtractorOutput {
        fresh
    }
}

/// The set of extractors a scanner runs.
///
/// Built once at startup and handed to the [`Scanner`](super::Scanner);
/// there is no global registry.
#[derive(Clone, Default)]
pub struct ExtractorRegistry {
    extractors: Vec<Arc<dyn Extractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the four standard extractors.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(LastMessageExtractor::new());
        registry.register(SecretExtractor::new());
        registry.register(CommandExtractor::new());
        registry.register(AuthChangeExtractor::new());
        registry
    }

    /// Add an extractor, replacing any existing one with the same id.
    pub fn register<E: Extractor + 'static>(&mut self, extractor: E) {
        self.register_arc(Arc::new(extractor));
    }

    pub fn register_arc(&mut self, extractor: Arc<dyn Extractor>) {
        self.extractors.retain(|e| e.id() != extractor.id());
        self.extractors.push(extractor);
    }

    pub fn get(&self, id: &str) -> Option<&Arc<dyn Extractor>> {
        self.extractors.iter().find(|e| e.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extractor>> {
        self.extractors.iter()
    }

    pub fn ids(&self) -> Vec<&'static str> {
        self.extractors.iter().map(|e| e.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }
}

impl std::fmt::Debug for ExtractorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractorRegistry")
            .field("extractors", &self.ids())
            .finish()
    }
}
