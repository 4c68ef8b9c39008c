//! Content-addressed blob store, keyed by the lowercase hex SHA-256 of the
//! blob's bytes.
//!
//! Writes are idempotent: two writers racing to `put` the same bytes produce
//! the same file, so no locking is required (`spec.md` §4.A).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to create storage directory {0:?}: {1}")]
    CreateDir(PathBuf, std::io::Error),
    #[error("failed to write {0:?}: {1}")]
    Write(PathBuf, std::io::Error),
    #[error("failed to read {0:?}: {1}")]
    Read(PathBuf, std::io::Error),
}

/// A directory of `<dir>/<sha256-hex>` files.
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

/// `true` iff `s` is a 64-character hex string (case-insensitive).
pub fn is_hash(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| b.is_ascii_hexdigit())
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store `bytes`, returning their lowercase hex SHA-256 hash. A no-op if
    /// an entry with that hash already exists.
    pub fn put(&self, bytes: &[u8]) -> Result<String, StoreError> {
        let hash = hex::encode(Sha256::digest(bytes));
        let path = self.path_for(&hash);

        if path.exists() {
            return Ok(hash);
        }

        std::fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::CreateDir(self.dir.clone(), e))?;
        std::fs::write(&path, bytes).map_err(|e| StoreError::Write(path.clone(), e))?;
        Ok(hash)
    }

    /// Fetch the bytes stored under `hash`. Returns `Ok(None)` for an
    /// invalid hash or a missing entry — both are "absent", not an error.
    pub fn get(&self, hash: &str) -> Result<Option<Vec<u8>>, StoreError> {
        if !is_hash(hash) {
            return Ok(None);
        }
        let path = self.path_for(&hash.to_lowercase());
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Read(path, e)),
        }
    }

    pub fn has(&self, hash: &str) -> bool {
        is_hash(hash) && self.path_for(&hash.to_lowercase()).exists()
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(hash)
    }
}

/// Directory name used for the content store under the program directory.
pub fn default_storage_dir(program_dir: &Path) -> PathBuf {
    program_dir.join("storage-data")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn put_then_get_round_trips() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let hash = store.put(b"hello world").unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(store.get(&hash).unwrap(), Some(b"hello world".to_vec()));
    }

    #[test]
    fn put_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let h1 = store.put(b"same bytes").unwrap();
        let h2 = store.put(b"same bytes").unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn get_missing_hash_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let absent = "a".repeat(64);
        assert_eq!(store.get(&absent).unwrap(), None);
    }

    #[test]
    fn get_invalid_hash_is_absent() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        assert_eq!(store.get("not-a-hash").unwrap(), None);
    }

    #[test]
    fn get_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let hash = store.put(b"payload").unwrap();
        let upper = hash.to_uppercase();
        assert_eq!(store.get(&upper).unwrap(), Some(b"payload".to_vec()));
    }

    #[test]
    fn has_reflects_presence() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let hash = store.put(b"x").unwrap();
        assert!(store.has(&hash));
        assert!(!store.has(&"0".repeat(64)));
    }

    #[test]
    fn hash_matches_sha256() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let hash = store.put(b"ping").unwrap();
        let expected = hex::encode(Sha256::digest(b"ping"));
        assert_eq!(hash, expected);
    }
}
