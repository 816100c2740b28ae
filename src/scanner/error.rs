//! Error types for the scanner internals.
//!
//! None of these ever reach callers of [`Scanner::scan`](super::Scanner::scan);
//! the coordinator converts every failure into a degraded result. They exist
//! so the leaves (reader, state store, validation) can report precisely what
//! went wrong and the coordinator can decide how to log it.

use std::path::PathBuf;

/// Rejected input to the scanner entry point.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("session id is empty")]
    EmptySessionId,

    #[error("session id exceeds {max} characters")]
    SessionIdTooLong { max: usize },

    #[error("session id contains disallowed character {0:?}")]
    InvalidSessionIdChar(char),

    #[error("session id starts with reserved prefix {0:?}")]
    ReservedSessionIdPrefix(&'static str),

    #[error("transcript path is not absolute: {0}")]
    RelativePath(PathBuf),

    #[error("transcript path exceeds {max} bytes")]
    PathTooLong { max: usize },
}

/// Failure reading the transcript.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("transcript not found: {path}")]
    NotFound { path: PathBuf },

    #[error("failed to read transcript {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReadError {
    pub(crate) fn from_io(path: &std::path::Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            ReadError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            ReadError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

/// Failure touching persisted scan state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    InvalidSession(#[from] ValidationError),

    #[error("failed to encode scan state: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("state I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StateError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        StateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}
