//! Input checks performed before any filesystem access.
//!
//! Session ids end up as file names under the state directory, so they are
//! restricted to a conservative alphabet. Anything else (dots, slashes,
//! whitespace, unicode) is rejected outright rather than sanitized. Ids
//! starting with a legacy state file prefix are rejected too, since their
//! state file would share a name with another session's legacy file.

use std::path::Path;

use super::error::ValidationError;
use super::state::{LEGACY_LAST_MESSAGE_PREFIX, LEGACY_SECRETS_PREFIX};

/// Longest accepted session id, in characters.
pub const MAX_SESSION_ID_LEN: usize = 128;

/// Longest accepted transcript path, in bytes.
pub const MAX_PATH_LEN: usize = 4096;

/// Session id prefixes owned by legacy state files.
pub const RESERVED_SESSION_ID_PREFIXES: &[&str] =
    &[LEGACY_LAST_MESSAGE_PREFIX, LEGACY_SECRETS_PREFIX];

/// Check a session id against the allow-list `[A-Za-z0-9_-]{1,128}`.
pub fn validate_session_id(session_id: &str) -> Result<(), ValidationError> {
    if session_id.is_empty() {
        return Err(ValidationError::EmptySessionId);
    }
    if session_id.len() > MAX_SESSION_ID_LEN {
        return Err(ValidationError::SessionIdTooLong {
            max: MAX_SESSION_ID_LEN,
        });
    }
    if let Some(bad) = session_id
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_'))
    {
        return Err(ValidationError::InvalidSessionIdChar(bad));
    }
    if let Some(prefix) = RESERVED_SESSION_ID_PREFIXES
        .iter()
        .find(|prefix| session_id.starts_with(*prefix))
    {
        return Err(ValidationError::ReservedSessionIdPrefix(*prefix));
    }
    Ok(())
}

/// Check that a transcript path is absolute and of sane length.
pub fn validate_transcript_path(path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().len() > MAX_PATH_LEN {
        return Err(ValidationError::PathTooLong { max: MAX_PATH_LEN });
    }
    if !path.is_absolute() {
        return Err(ValidationError::RelativePath(path.to_path_buf()));
    }
    Ok(())
}
