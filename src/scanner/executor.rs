//! Concurrent extractor execution with per-extractor deadlines.
//!
//! Every extractor runs on its own named thread and reports back over a
//! dedicated channel. The caller waits on each channel until that
//! extractor's deadline; a thread that misses it is abandoned (not killed)
//! and its late result is dropped with the channel.
//!
//! Total latency is bounded by the slowest extractor that finishes in time,
//! not by the sum of all extractors.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::extractor::{Extractor, ExtractorOutput, ExtractorRegistry};
use super::types::ParsedLine;

/// How one extractor run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(ExtractorOutput),
    TimedOut,
    Failed(String),
}

/// Result of running one extractor.
#[derive(Debug, Clone)]
pub struct ExtractorRun {
    pub id: &'static str,
    pub outcome: RunOutcome,
    /// Wall time until completion, or the timeout when abandoned.
    pub duration: Duration,
}

impl ExtractorRun {
    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Completed(_))
    }
}

type RunMessage = (Result<ExtractorOutput, String>, Duration);

struct Pending {
    id: &'static str,
    started: Instant,
    rx: Option<Receiver<RunMessage>>,
    spawn_error: Option<String>,
}

/// Run every registered extractor against `lines`, each bounded by `timeout`.
///
/// Results come back in registry order.
pub fn run_extractors(
    registry: &ExtractorRegistry,
    lines: Arc<[ParsedLine]>,
    timeout: Duration,
) -> Vec<ExtractorRun> {
    let pending: Vec<Pending> = registry
        .iter()
        .map(|extractor| spawn_extractor(Arc::clone(extractor), Arc::clone(&lines)))
        .collect();

    pending
        .into_iter()
        .map(|task| collect(task, timeout))
        .collect()
}

fn spawn_extractor(extractor: Arc<dyn Extractor>, lines: Arc<[ParsedLine]>) -> Pending {
    let id = extractor.id();
    let (tx, rx) = channel::<RunMessage>();
    let started = Instant::now();

    let spawned = thread::Builder::new()
        .name(format!("extractor-{}", id))
        .spawn(move || {
            let begin = Instant::now();
            let result = catch_unwind(AssertUnwindSafe(|| extractor.extract(&lines)))
                .map_err(|payload| panic_message(payload.as_ref()));
            // Receiver is gone if we already timed out
            let _ = tx.send((result, begin.elapsed()));
        });

    match spawned {
        Ok(_) => Pending {
            id,
            started,
            rx: Some(rx),
            spawn_error: None,
        },
        Err(e) => Pending {
            id,
            started,
            rx: None,
            spawn_error: Some(format!("failed to spawn thread: {}", e)),
        },
    }
}

fn collect(task: Pending, timeout: Duration) -> ExtractorRun {
    let Some(rx) = task.rx else {
        return ExtractorRun {
            id: task.id,
            outcome: RunOutcome::Failed(task.spawn_error.unwrap_or_default()),
            duration: Duration::ZERO,
        };
    };

    let remaining = (task.started + timeout).saturating_duration_since(Instant::now());
    match rx.recv_timeout(remaining) {
        Ok((Ok(output), duration)) => ExtractorRun {
            id: task.id,
            outcome: RunOutcome::Completed(output),
            duration,
        },
        Ok((Err(message), duration)) => ExtractorRun {
            id: task.id,
            outcome: RunOutcome::Failed(message),
            duration,
        },
        Err(RecvTimeoutError::Timeout) => ExtractorRun {
            id: task.id,
            outcome: RunOutcome::TimedOut,
            duration: timeout,
        },
        Err(RecvTimeoutError::Disconnected) => ExtractorRun {
            id: task.id,
            outcome: RunOutcome::Failed("extractor thread exited without a result".to_string()),
            duration: task.started.elapsed(),
        },
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked".to_string()
    }
}
