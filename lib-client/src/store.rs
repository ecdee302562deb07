//! Key-value stores backing the vote record log
//!
//! The log is a single JSON document under one key. Stores only move bytes;
//! they know nothing about records.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::{ClientError, Result};

/// Minimal key-value persistence
pub trait RecordStore: Send + Sync {
    /// Read the value for `key`, `None` if it was never written
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Write (or overwrite) the value for `key`
    fn put(&self, key: &str, value: &[u8]) -> Result<()>;
}

/// Volatile store for tests and sessions that opt out of persistence
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| ClientError::StorageError("memory store lock poisoned".into()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| ClientError::StorageError("memory store lock poisoned".into()))?;
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }
}

/// One JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `dir` (created lazily on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ClientError::StorageError(format!("Invalid store key: {:?}", key)));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl RecordStore for FileRecordStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }

    fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir)?;

        // Write beside the target and rename so a crash never leaves a torn log
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
