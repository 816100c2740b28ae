//! Slash command detection.

use std::sync::OnceLock;
use std::time::Duration;

use regex_lite::Regex;

use super::secrets::mask_secrets;
use crate::scanner::extractor::{Extractor, ExtractorOutput};
use crate::scanner::types::{Command, ParsedLine, SenderRole};

/// Commands that count. Anything else starting with `/` is ordinary text.
pub const KNOWN_COMMANDS: &[&str] = &[
    "/account",
    "/add-dir",
    "/agents",
    "/bug",
    "/clear",
    "/compact",
    "/config",
    "/context",
    "/cost",
    "/doctor",
    "/exit",
    "/export",
    "/help",
    "/hooks",
    "/init",
    "/login",
    "/logout",
    "/mcp",
    "/memory",
    "/model",
    "/permissions",
    "/resume",
    "/review",
    "/status",
    "/switch-account",
    "/vim",
];

/// Most recent commands kept across scans.
pub const MAX_COMMAND_HISTORY: usize = 50;

/// Agent CLIs wrap locally handled commands in tags instead of echoing the
/// raw text.
fn command_tag_regexes() -> Option<&'static (Regex, Regex)> {
    static REGEXES: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    REGEXES
        .get_or_init(|| {
            let name = Regex::new(r"(?s)<command-name>\s*(/[^<\s]+)\s*</command-name>").ok()?;
            let args = Regex::new(r"(?s)<command-args>(.*?)</command-args>").ok()?;
            Some((name, args))
        })
        .as_ref()
}

/// Parse a recognized command out of message text.
///
/// Returns the command name (with its slash) and its arguments.
pub fn parse_command(text: &str) -> Option<(String, Vec<String>)> {
    let trimmed = text.trim_start();

    if trimmed.starts_with('/') {
        let mut parts = trimmed.split_whitespace();
        let name = parts.next()?;
        if !KNOWN_COMMANDS.contains(&name) {
            return None;
        }
        return Some((name.to_string(), parts.map(str::to_string).collect()));
    }

    let (name_re, args_re) = command_tag_regexes()?;
    let name = name_re.captures(trimmed)?.get(1)?.as_str();
    if !KNOWN_COMMANDS.contains(&name) {
        return None;
    }
    let args = args_re
        .captures(trimmed)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    Some((name.to_string(), args))
}

/// Collects allow-listed slash commands typed by the human.
#[derive(Debug, Default)]
pub struct CommandExtractor;

impl CommandExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for CommandExtractor {
    fn id(&self) -> &'static str {
        "commands"
    }

    fn persist(&self) -> bool {
        true
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    fn empty(&self) -> ExtractorOutput {
        ExtractorOutput::Commands(Vec::new())
    }

    fn extract(&self, lines: &[ParsedLine]) -> ExtractorOutput {
        let commands = lines
            .iter()
            .filter(|line| line.role() == SenderRole::Human)
            .filter_map(|line| {
                // Masked before splitting so `key = value` arguments are caught too
                let (name, args) = parse_command(&mask_secrets(line.text()?))?;
                Some(Command {
                    name,
                    timestamp: line.timestamp_ms(),
                    args,
                    line: line.line_number,
                })
            })
            .collect();
        ExtractorOutput::Commands(commands)
    }

    fn merge(&self, previous: ExtractorOutput, fresh: ExtractorOutput) -> ExtractorOutput {
        let (ExtractorOutput::Commands(mut history), ExtractorOutput::Commands(fresh)) =
            (previous, fresh)
        else {
            return self.empty();
        };
        history.extend(fresh);
        if history.len() > MAX_COMMAND_HISTORY {
            history.drain(..history.len() - MAX_COMMAND_HISTORY);
        }
        ExtractorOutput::Commands(history)
    }
}
