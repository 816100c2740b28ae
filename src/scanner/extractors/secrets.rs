//! Credential leak detection.
//!
//! Runs a fixed set of typed patterns over each decoded line. Matched values
//! are fingerprinted and redacted immediately; the raw value is dropped
//! before anything leaves this module.

use std::collections::HashSet;
use std::sync::OnceLock;
use std::time::Duration;

use regex_lite::{Captures, Regex};
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::scanner::extractor::{Extractor, ExtractorOutput};
use crate::scanner::types::{ParsedLine, Secret};

/// Values shorter than this are shown as [`REDACTED_PLACEHOLDER`].
pub const MIN_REDACTABLE_LEN: usize = 12;

/// Shown instead of a value too short to partially reveal.
pub const REDACTED_PLACEHOLDER: &str = "****";

/// Number of hex characters of the value hash kept in a fingerprint.
const FINGERPRINT_HASH_LEN: usize = 16;

/// (kind, pattern). When a pattern has a capture group, group 1 is the value.
const PATTERNS: &[(&str, &str)] = &[
    ("anthropic_api_key", r"sk-ant-[A-Za-z0-9_-]{20,}"),
    ("openai_api_key", r"sk-(?:proj-)?[A-Za-z0-9]{32,}"),
    ("github_token", r"gh[pousr]_[A-Za-z0-9]{36,}"),
    ("aws_access_key", r"AKIA[0-9A-Z]{16}"),
    ("slack_token", r"xox[abprs]-[A-Za-z0-9-]{10,}"),
    (
        "private_key",
        r"-----BEGIN (?:RSA |EC |DSA |OPENSSH |PGP )?PRIVATE KEY(?: BLOCK)?-----",
    ),
    (
        "generic_secret",
        r#"(?i)(?:api[_-]?key|secret|password|passwd|access[_-]?token)\\?["']?\s*[:=]\s*\\?["']?([A-Za-z0-9_/+=.-]{16,})"#,
    ),
];

struct SecretPattern {
    kind: &'static str,
    regex: Regex,
}

fn compiled_patterns() -> &'static [SecretPattern] {
    static COMPILED: OnceLock<Vec<SecretPattern>> = OnceLock::new();
    COMPILED.get_or_init(|| {
        PATTERNS
            .iter()
            .filter_map(|&(kind, pattern)| match Regex::new(pattern) {
                Ok(regex) => Some(SecretPattern { kind, regex }),
                Err(e) => {
                    warn!(kind, error = %e, "skipping secret pattern that failed to compile");
                    None
                }
            })
            .collect()
    })
}

/// Detects credential-shaped strings.
pub struct SecretExtractor {
    patterns: &'static [SecretPattern],
}

impl std::fmt::Debug for SecretExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretExtractor")
            .field("patterns", &self.patterns.len())
            .finish()
    }
}

impl SecretExtractor {
    pub fn new() -> Self {
        Self {
            patterns: compiled_patterns(),
        }
    }

    fn scan_line(&self, line: &ParsedLine, seen: &mut HashSet<String>, found: &mut Vec<Secret>) {
        let Some(payload) = &line.payload else {
            return;
        };
        let Ok(serialized) = serde_json::to_string(payload) else {
            return;
        };

        for pattern in self.patterns {
            for caps in pattern.regex.captures_iter(&serialized) {
                let Some(value) = caps.get(1).or_else(|| caps.get(0)) else {
                    continue;
                };
                let value = value.as_str();
                let fingerprint = fingerprint(pattern.kind, value);
                if seen.insert(fingerprint.clone()) {
                    found.push(Secret {
                        kind: pattern.kind.to_string(),
                        fingerprint,
                        line: line.line_number,
                        redacted: redact(value),
                    });
                }
            }
        }
    }
}

impl Default for SecretExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl Extractor for SecretExtractor {
    fn id(&self) -> &'static str {
        "secrets"
    }

    fn persist(&self) -> bool {
        true
    }

    /// Pattern scanning is the most expensive extractor and secrets rarely
    /// disappear, so its persisted output stays trusted for minutes.
    fn cache_ttl(&self) -> Option<Duration> {
        Some(Duration::from_secs(5 * 60))
    }

    fn empty(&self) -> ExtractorOutput {
        ExtractorOutput::Secrets(Vec::new())
    }

    fn extract(&self, lines: &[ParsedLine]) -> ExtractorOutput {
        let mut seen = HashSet::new();
        let mut found = Vec::new();
        for line in lines {
            self.scan_line(line, &mut seen, &mut found);
        }
        ExtractorOutput::Secrets(found)
    }

    /// Union by fingerprint; the first sighting's location is kept.
    fn merge(&self, previous: ExtractorOutput, fresh: ExtractorOutput) -> ExtractorOutput {
        let (ExtractorOutput::Secrets(mut merged), ExtractorOutput::Secrets(fresh)) =
            (previous, fresh)
        else {
            return self.empty();
        };
        let mut seen: HashSet<String> = merged.iter().map(|s| s.fingerprint.clone()).collect();
        for secret in fresh {
            if seen.insert(secret.fingerprint.clone()) {
                merged.push(secret);
            }
        }
        ExtractorOutput::Secrets(merged)
    }
}

/// Replace every credential-shaped value in `text` with its redacted form.
///
/// Surrounding text, such as the `API_KEY=` of an assignment, is kept.
pub fn mask_secrets(text: &str) -> String {
    let mut masked = text.to_string();
    for pattern in compiled_patterns() {
        if !pattern.regex.is_match(&masked) {
            continue;
        }
        masked = pattern
            .regex
            .replace_all(&masked, |caps: &Captures<'_>| {
                let whole = &caps[0];
                match caps.get(1) {
                    Some(value) => whole.replacen(value.as_str(), &redact(value.as_str()), 1),
                    None => redact(whole),
                }
            })
            .into_owned();
    }
    masked
}

/// `kind:` followed by a prefix of the SHA-256 of the value.
pub fn fingerprint(kind: &str, value: &str) -> String {
    let digest = hex::encode(Sha256::digest(value.as_bytes()));
    format!("{}:{}", kind, &digest[..FINGERPRINT_HASH_LEN])
}

/// First four and last four characters joined by `...`.
pub fn redact(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < MIN_REDACTABLE_LEN {
        return REDACTED_PLACEHOLDER.to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}
