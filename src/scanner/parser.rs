//! Tolerant JSONL line parser.
//!
//! Splits raw bytes into lines and decodes each as a JSON object. A line that
//! fails to decode is kept with its failure reason; nothing here ever returns
//! an error.

use rayon::prelude::*;
use serde_json::Value;

use super::types::{ParsedLine, SenderRole};

/// Batches with more lines than this are decoded on the rayon pool.
///
/// Below it, thread hand-off costs more than the JSON decoding itself.
pub const PARALLEL_THRESHOLD: usize = 2048;

/// Parse `bytes` into one [`ParsedLine`] per non-blank line, in order.
///
/// Line numbers start at `first_line_number` and count non-blank lines only.
pub fn parse_lines(bytes: &[u8], first_line_number: u64) -> Vec<ParsedLine> {
    let segments: Vec<&[u8]> = bytes
        .split(|b| *b == b'\n')
        .map(strip_cr)
        .filter(|segment| !segment.iter().all(u8::is_ascii_whitespace))
        .collect();

    let parse = |(index, segment): (usize, &&[u8])| {
        parse_line(segment, first_line_number + index as u64)
    };

    if segments.len() > PARALLEL_THRESHOLD {
        segments.par_iter().enumerate().map(parse).collect()
    } else {
        segments.iter().enumerate().map(parse).collect()
    }
}

/// Decode a single line.
pub fn parse_line(segment: &[u8], line_number: u64) -> ParsedLine {
    let text = match std::str::from_utf8(segment) {
        Ok(text) => text,
        Err(e) => {
            return ParsedLine {
                line_number,
                raw: String::from_utf8_lossy(segment).into_owned(),
                payload: None,
                error: Some(format!("invalid UTF-8: {}", e)),
            }
        }
    };

    let (payload, error) = match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => (Some(value), None),
        Ok(other) => (
            None,
            Some(format!("expected a JSON object, found {}", json_kind(&other))),
        ),
        Err(e) => (None, Some(e.to_string())),
    };

    ParsedLine {
        line_number,
        raw: text.to_string(),
        payload,
        error,
    }
}

/// Number of leading bytes that form complete lines.
///
/// A writer may be halfway through appending a record when we read. The tail
/// after the last newline counts as complete only if it already decodes as a
/// JSON object; otherwise it is left for the next scan.
pub fn committed_len(bytes: &[u8]) -> usize {
    let tail_start = bytes
        .iter()
        .rposition(|b| *b == b'\n')
        .map(|pos| pos + 1)
        .unwrap_or(0);
    let tail = strip_cr(&bytes[tail_start..]);

    if tail.iter().all(u8::is_ascii_whitespace) {
        return bytes.len();
    }
    match serde_json::from_slice::<Value>(tail) {
        Ok(Value::Object(_)) => bytes.len(),
        _ => tail_start,
    }
}

fn strip_cr(segment: &[u8]) -> &[u8] {
    segment.strip_suffix(b"\r").unwrap_or(segment)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl ParsedLine {
    /// Author of the entry.
    ///
    /// Looks at `role`, then `message.role`, then `type`, so both flat
    /// `{"role":"human",...}` records and nested `{"type":"user","message":{...}}`
    /// records resolve.
    pub fn role(&self) -> SenderRole {
        let Some(payload) = &self.payload else {
            return SenderRole::Unknown;
        };
        let role = payload
            .get("role")
            .and_then(Value::as_str)
            .or_else(|| {
                payload
                    .get("message")
                    .and_then(|m| m.get("role"))
                    .and_then(Value::as_str)
            })
            .or_else(|| payload.get("type").and_then(Value::as_str));

        match role {
            Some("human") | Some("user") => SenderRole::Human,
            Some("assistant") => SenderRole::Assistant,
            _ => SenderRole::Unknown,
        }
    }

    /// Extractable text of the entry.
    ///
    /// Accepts a plain string in `text`, `content` or `message.content`, or a
    /// list of content blocks, in which case the first `text`-typed block
    /// wins.
    pub fn text(&self) -> Option<&str> {
        let payload = self.payload.as_ref()?;
        if let Some(text) = payload.get("text").and_then(Value::as_str) {
            return Some(text);
        }
        if let Some(text) = payload.get("content").and_then(content_text) {
            return Some(text);
        }
        let message = payload.get("message")?;
        if let Some(text) = message.as_str() {
            return Some(text);
        }
        message.get("content").and_then(content_text)
    }

    /// Entry timestamp in unix milliseconds, 0 if absent or unreadable.
    pub fn timestamp_ms(&self) -> i64 {
        self.payload
            .as_ref()
            .and_then(|p| p.get("timestamp").or_else(|| p.get("ts")))
            .map(timestamp_to_ms)
            .unwrap_or(0)
    }

    /// Whether this entry counts toward turn numbering.
    pub fn is_conversational(&self) -> bool {
        matches!(self.role(), SenderRole::Human | SenderRole::Assistant)
    }
}

fn content_text(content: &Value) -> Option<&str> {
    match content {
        Value::String(text) => Some(text),
        Value::Array(blocks) => blocks
            .iter()
            .find(|block| block.get("type").and_then(Value::as_str) == Some("text"))
            .and_then(|block| block.get("text"))
            .and_then(Value::as_str),
        _ => None,
    }
}

/// Values below this are taken to be seconds rather than milliseconds.
const SECONDS_CUTOFF: f64 = 100_000_000_000.0;

pub(crate) fn timestamp_to_ms(value: &Value) -> i64 {
    match value {
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.timestamp_millis())
            .unwrap_or(0),
        Value::Number(n) => match n.as_f64() {
            Some(v) if v < SECONDS_CUTOFF => (v * 1000.0) as i64,
            Some(v) => v as i64,
            None => 0,
        },
        _ => 0,
    }
}
