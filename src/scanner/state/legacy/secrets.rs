//! `secrets-<id>.json`: `{ offset, mtime, knownFingerprints }`.
//!
//! Only fingerprints were stored, so migrated secrets carry no location and a
//! fully masked redaction.

use serde::Deserialize;

use super::{mtime_to_ms, LegacyFragment};
use crate::scanner::extractor::ExtractorOutput;
use crate::scanner::extractors::REDACTED_PLACEHOLDER;
use crate::scanner::types::Secret;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SecretsFile {
    offset: u64,
    #[serde(default)]
    mtime: f64,
    #[serde(default)]
    known_fingerprints: Vec<String>,
}

pub(super) fn convert(bytes: &[u8]) -> Result<LegacyFragment, serde_json::Error> {
    let file: SecretsFile = serde_json::from_slice(bytes)?;

    let mut secrets: Vec<Secret> = Vec::with_capacity(file.known_fingerprints.len());
    for fingerprint in file.known_fingerprints {
        if secrets.iter().any(|s| s.fingerprint == fingerprint) {
            continue;
        }
        let kind = fingerprint
            .split_once(':')
            .map(|(kind, _)| kind)
            .unwrap_or("unknown")
            .to_string();
        secrets.push(Secret {
            kind,
            fingerprint,
            line: 0,
            redacted: REDACTED_PLACEHOLDER.to_string(),
        });
    }

    Ok(LegacyFragment {
        offset: file.offset,
        mtime_ms: mtime_to_ms(file.mtime),
        extractor_id: "secrets",
        output: ExtractorOutput::Secrets(secrets),
    })
}
