//! Incremental byte-range reader.
//!
//! Reads only the bytes appended since the last recorded offset. The reader
//! holds no state: the caller passes the position it remembered and gets back
//! the new bytes plus the position to remember next time.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::debug;

use super::error::ReadError;

/// Outcome of one incremental read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReadResult {
    /// Bytes read this call (empty when nothing changed).
    pub bytes: Vec<u8>,
    /// Offset the bytes were read from (0 after truncation).
    pub start_offset: u64,
    /// Offset just past the last byte read (end of file at stat time).
    pub new_offset: u64,
    /// File modification time in unix milliseconds.
    pub mtime_ms: i64,
    /// File size at stat time.
    pub size: u64,
    /// Modification time and size matched the caller's values; nothing was read.
    pub unchanged: bool,
    /// The file shrank below the last offset and was re-read from the start.
    pub truncated: bool,
}

/// Convert a `SystemTime` to unix milliseconds, clamping pre-epoch values to 0.
pub fn system_time_to_unix_ms(value: SystemTime) -> i64 {
    value
        .duration_since(UNIX_EPOCH)
        .ok()
        .and_then(|d| i64::try_from(d.as_millis()).ok())
        .unwrap_or(0)
}

/// Read whatever was appended to `path` since `last_offset`.
///
/// - If the modification time equals `last_mtime_ms` and the size equals
///   `last_offset`, returns an empty result with `unchanged = true` without
///   opening the file.
/// - If the file is smaller than `last_offset`, it was truncated or
///   replaced: the whole file is read and `truncated = true`.
/// - Otherwise exactly `size - last_offset` bytes are read.
pub fn read_incremental(
    path: &Path,
    last_offset: u64,
    last_mtime_ms: i64,
) -> Result<ReadResult, ReadError> {
    let metadata = std::fs::metadata(path).map_err(|e| ReadError::from_io(path, e))?;
    let size = metadata.len();
    let mtime_ms = metadata
        .modified()
        .map(system_time_to_unix_ms)
        .unwrap_or(0);

    if mtime_ms == last_mtime_ms && size == last_offset {
        return Ok(ReadResult {
            bytes: Vec::new(),
            start_offset: last_offset,
            new_offset: last_offset,
            mtime_ms,
            size,
            unchanged: true,
            truncated: false,
        });
    }

    let truncated = size < last_offset;
    let start_offset = if truncated {
        debug!(
            path = %path.display(),
            old_offset = last_offset,
            new_size = size,
            "transcript shrank below recorded offset, rescanning from start"
        );
        0
    } else {
        last_offset
    };

    let to_read = size - start_offset;
    let mut bytes = Vec::with_capacity(usize::try_from(to_read).unwrap_or(0));
    if to_read > 0 {
        let mut file = File::open(path).map_err(|e| ReadError::from_io(path, e))?;
        file.seek(SeekFrom::Start(start_offset))
            .map_err(|e| ReadError::from_io(path, e))?;
        // Never read past the size observed at stat time, even if the writer
        // appended more in the meantime; that tail belongs to the next scan.
        file.take(to_read)
            .read_to_end(&mut bytes)
            .map_err(|e| ReadError::from_io(path, e))?;
    }

    let new_offset = start_offset + bytes.len() as u64;
    Ok(ReadResult {
        bytes,
        start_offset,
        new_offset,
        mtime_ms,
        size,
        unchanged: false,
        truncated,
    })
}
