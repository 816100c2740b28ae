//! Login and account-switch events.
//!
//! Never persisted: the consumer of this signal acts on it, so replaying a
//! stale event from a previous scan would switch accounts twice.

use std::sync::OnceLock;

use regex_lite::Regex;

use super::commands::parse_command;
use super::secrets::mask_secrets;
use crate::scanner::extractor::{Extractor, ExtractorOutput};
use crate::scanner::types::{AuthChange, ParsedLine, SenderRole};

/// Commands that start a login or account switch.
pub const AUTH_COMMANDS: &[&str] = &["/login", "/account", "/switch-account"];

fn confirmation_regex() -> Option<&'static Regex> {
    static REGEX: OnceLock<Option<Regex>> = OnceLock::new();
    REGEX
        .get_or_init(|| {
            Regex::new(
                r"(?i)(?:logged in as|login successful for|switched to account|now using account)\s+([^\s'`<>]+)",
            )
            .ok()
        })
        .as_ref()
}

/// Account named by a confirmation message, if any.
pub fn confirmed_account(text: &str) -> Option<String> {
    let caps = confirmation_regex()?.captures(text)?;
    let account = caps
        .get(1)?
        .as_str()
        .trim_end_matches(&['.', ',', ';', ')', '"'][..]);
    if account.is_empty() {
        None
    } else {
        Some(account.to_string())
    }
}

/// Pairs an auth command with the confirmation that follows it.
#[derive(Debug, Default)]
pub struct AuthChangeExtractor;

impl AuthChangeExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for AuthChangeExtractor {
    fn id(&self) -> &'static str {
        "auth_changes"
    }

    fn persist(&self) -> bool {
        false
    }

    fn empty(&self) -> ExtractorOutput {
        ExtractorOutput::AuthChanges(Vec::new())
    }

    fn extract(&self, lines: &[ParsedLine]) -> ExtractorOutput {
        let mut events = Vec::new();
        let mut pending = false;

        for line in lines {
            let Some(text) = line.text() else {
                continue;
            };

            if line.role() == SenderRole::Human {
                if let Some((name, _)) = parse_command(text) {
                    if AUTH_COMMANDS.contains(&name.as_str()) {
                        pending = true;
                        continue;
                    }
                }
            }

            if !pending {
                continue;
            }
            if let Some(account) = confirmed_account(text) {
                events.push(AuthChange {
                    timestamp: line.timestamp_ms(),
                    account: mask_secrets(&account),
                    line: line.line_number,
                });
                pending = false;
            }
        }

        ExtractorOutput::AuthChanges(events)
    }
}
