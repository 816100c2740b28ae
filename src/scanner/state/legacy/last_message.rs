//! `last-message-<id>.json`: `{ offset, mtime, lastMessage }`.

use serde::Deserialize;
use serde_json::Value;

use super::{mtime_to_ms, LegacyFragment};
use crate::scanner::extractor::ExtractorOutput;
use crate::scanner::parser::timestamp_to_ms;
use crate::scanner::types::{MessageInfo, SenderRole};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LastMessageFile {
    offset: u64,
    #[serde(default)]
    mtime: f64,
    #[serde(default)]
    last_message: Option<LegacyMessage>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyMessage {
    timestamp: Value,
    preview: String,
    sender: String,
    turn_number: u64,
}

pub(super) fn convert(bytes: &[u8]) -> Result<LegacyFragment, serde_json::Error> {
    let file: LastMessageFile = serde_json::from_slice(bytes)?;
    let message = file.last_message.unwrap_or_default();

    let sender = match message.sender.as_str() {
        "human" | "user" => SenderRole::Human,
        "assistant" => SenderRole::Assistant,
        _ => SenderRole::Unknown,
    };

    Ok(LegacyFragment {
        offset: file.offset,
        mtime_ms: mtime_to_ms(file.mtime),
        extractor_id: "last_message",
        output: ExtractorOutput::LastMessage(MessageInfo {
            timestamp: timestamp_to_ms(&message.timestamp),
            preview: message.preview,
            sender,
            turn_number: message.turn_number,
            // The running total was never stored; the turn number is the
            // closest lower bound.
            total_messages: message.turn_number,
        }),
    })
}
