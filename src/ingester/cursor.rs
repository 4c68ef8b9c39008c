//! The `(lastBlock, lastLogIndex)` watermark (`spec.md` §3, §4.E).

use std::fs;
use std::path::{Path, PathBuf};

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use super::error::IngestError;

/// Stands in for the "+∞" sentinel the spec describes for "no more events
/// expected for this block" — no real log index reaches anywhere near
/// `i64::MAX`, so it sorts after every genuine index.
pub const LOG_INDEX_INF: i64 = i64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor {
    pub block: u64,
    pub log_index: i64,
}

impl Cursor {
    pub const START: Cursor = Cursor { block: 0, log_index: -1 };

    pub fn at_head(block: u64) -> Self {
        Cursor { block, log_index: LOG_INDEX_INF }
    }

    /// `true` iff `(block, log_index)` is strictly past this cursor —
    /// the at-most-once delivery test (`spec.md` §8 invariant 2).
    pub fn is_before(&self, block: u64, log_index: u64) -> bool {
        (self.block, self.log_index) < (block, log_index as i64)
    }
}

#[derive(Serialize, Deserialize)]
struct CursorFile {
    block: u64,
    #[serde(rename = "logIndex")]
    log_index: i64,
}

/// `<config-dir>/<lower-hex-contract-address>.last-processed-block`.
pub fn cursor_path(config_dir: &Path, contract: Address) -> PathBuf {
    config_dir.join(format!("{contract:#x}.last-processed-block"))
}

/// Read the persisted cursor, accepting the legacy bare-integer format
/// (`spec.md` §3 — "treat `lastLogIndex` as -1").  A missing file means the
/// node has never run against this contract: start from `(0, -1)`.
pub fn read(path: &Path) -> Result<Cursor, IngestError> {
    let content = match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Cursor::START),
        Err(e) => return Err(IngestError::CursorRead(path.to_path_buf(), e)),
    };
    parse(path, &content)
}

fn parse(path: &Path, content: &str) -> Result<Cursor, IngestError> {
    let trimmed = content.trim();
    if let Ok(block) = trimmed.parse::<u64>() {
        return Ok(Cursor { block, log_index: -1 });
    }
    let file: CursorFile = serde_json::from_str(trimmed)
        .map_err(|e| IngestError::CursorParse(path.to_path_buf(), e))?;
    Ok(Cursor { block: file.block, log_index: file.log_index })
}

/// Persist the cursor. Synchronous, per `spec.md` §5 — a crash loses at
/// most the event currently being processed, never more.
pub fn persist(path: &Path, cursor: Cursor) -> Result<(), IngestError> {
    let file = CursorFile { block: cursor.block, log_index: cursor.log_index };
    let json = serde_json::to_string(&file).expect("CursorFile always serializes");
    fs::write(path, json).map_err(|e| IngestError::CursorWrite(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_starts_at_zero() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.last-processed-block");
        assert_eq!(read(&path).unwrap(), Cursor::START);
    }

    #[test]
    fn legacy_bare_integer_format() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.last-processed-block");
        fs::write(&path, "42").unwrap();
        assert_eq!(read(&path).unwrap(), Cursor { block: 42, log_index: -1 });
    }

    #[test]
    fn json_object_format_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.last-processed-block");
        let cursor = Cursor { block: 100, log_index: 5 };
        persist(&path, cursor).unwrap();
        assert_eq!(read(&path).unwrap(), cursor);
    }

    #[test]
    fn at_head_uses_infinite_log_index() {
        let cursor = Cursor::at_head(250);
        assert_eq!(cursor.block, 250);
        assert_eq!(cursor.log_index, LOG_INDEX_INF);
    }

    #[test]
    fn is_before_is_lexicographic() {
        let cursor = Cursor { block: 100, log_index: 5 };
        assert!(cursor.is_before(100, 6));
        assert!(cursor.is_before(101, 0));
        assert!(!cursor.is_before(100, 5));
        assert!(!cursor.is_before(100, 4));
        assert!(!cursor.is_before(99, 9999));
    }

    #[test]
    fn legacy_cursor_redelivers_whole_block() {
        // S4: file contains "42" → {block:42, logIndex:-1}; every event in
        // block 42 (logIndex >= 0) is strictly after the cursor.
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("c.last-processed-block");
        fs::write(&path, "42").unwrap();
        let cursor = read(&path).unwrap();
        assert!(cursor.is_before(42, 0));
        assert!(cursor.is_before(42, 7));
        assert!(!cursor.is_before(41, 0));
    }
}
