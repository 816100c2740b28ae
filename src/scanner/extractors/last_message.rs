//! Most recent human message preview.

use std::time::Duration;

use super::secrets::mask_secrets;
use crate::scanner::extractor::{Extractor, ExtractorOutput};
use crate::scanner::types::{MessageInfo, ParsedLine, SenderRole};

/// Maximum preview length in characters, marker included.
pub const PREVIEW_MAX_CHARS: usize = 80;

/// Appended to truncated previews.
pub const TRUNCATION_MARKER: &str = "..";

/// Finds the newest human entry with text and builds a short preview of it.
#[derive(Debug, Default)]
pub struct LastMessageExtractor;

impl LastMessageExtractor {
    pub fn new() -> Self {
        Self
    }
}

impl Extractor for LastMessageExtractor {
    fn id(&self) -> &'static str {
        "last_message"
    }

    fn persist(&self) -> bool {
        true
    }

    fn cache_ttl(&self) -> Option<Duration> {
        Some(Duration::from_secs(30))
    }

    fn empty(&self) -> ExtractorOutput {
        ExtractorOutput::LastMessage(MessageInfo::default())
    }

    fn extract(&self, lines: &[ParsedLine]) -> ExtractorOutput {
        ExtractorOutput::LastMessage(find_last_message(lines))
    }

    /// Turn numbers restart at each window; offset them by what earlier
    /// scans already counted. An empty window keeps the previous message.
    fn merge(&self, previous: ExtractorOutput, fresh: ExtractorOutput) -> ExtractorOutput {
        let (ExtractorOutput::LastMessage(prev), ExtractorOutput::LastMessage(mut next)) =
            (previous, fresh)
        else {
            return self.empty();
        };

        let total = prev.total_messages + next.total_messages;
        if next.is_empty() {
            return ExtractorOutput::LastMessage(MessageInfo {
                total_messages: total,
                ..prev
            });
        }
        next.turn_number += prev.total_messages;
        next.total_messages = total;
        ExtractorOutput::LastMessage(next)
    }
}

fn find_last_message(lines: &[ParsedLine]) -> MessageInfo {
    let total_messages = lines.iter().filter(|l| l.is_conversational()).count() as u64;

    let found = lines.iter().enumerate().rev().find_map(|(index, line)| {
        if line.role() != SenderRole::Human {
            return None;
        }
        let text = line.text()?;
        let preview = make_preview(text);
        if preview.is_empty() {
            return None;
        }
        Some((index, line, preview))
    });

    let Some((index, line, preview)) = found else {
        return MessageInfo {
            total_messages,
            ..MessageInfo::default()
        };
    };

    let turn_number = lines[..=index]
        .iter()
        .filter(|l| l.is_conversational())
        .count() as u64;

    MessageInfo {
        timestamp: line.timestamp_ms(),
        preview,
        sender: SenderRole::Human,
        turn_number,
        total_messages,
    }
}

/// Mask secrets, collapse whitespace and cap at [`PREVIEW_MAX_CHARS`].
pub fn make_preview(text: &str) -> String {
    let masked = mask_secrets(text);
    let collapsed = masked.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= PREVIEW_MAX_CHARS {
        return collapsed;
    }
    let keep = PREVIEW_MAX_CHARS - TRUNCATION_MARKER.chars().count();
    let mut preview: String = collapsed.chars().take(keep).collect();
    preview.push_str(TRUNCATION_MARKER);
    preview
}
