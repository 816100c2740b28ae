//! The standard extractors.
//!
//! - [`LastMessageExtractor`] - newest human message preview and turn count
//! - [`SecretExtractor`] - credential-shaped strings, redacted
//! - [`CommandExtractor`] - allow-listed slash commands
//! - [`AuthChangeExtractor`] - confirmed logins and account switches

mod auth;
mod commands;
mod last_message;
mod secrets;

pub use auth::{confirmed_account, AuthChangeExtractor, AUTH_COMMANDS};
pub use commands::{parse_command, CommandExtractor, KNOWN_COMMANDS, MAX_COMMAND_HISTORY};
pub use last_message::{make_preview, LastMessageExtractor, PREVIEW_MAX_CHARS, TRUNCATION_MARKER};
pub use secrets::{
    fingerprint, mask_secrets, redact, SecretExtractor, MIN_REDACTABLE_LEN, REDACTED_PLACEHOLDER,
};
