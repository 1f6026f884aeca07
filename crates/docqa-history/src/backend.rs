//! Key-value persistence backends for the history table.
//!
//! A backend stores opaque byte blobs under a namespace and enforces a
//! total capacity, reporting overflow as [`HistoryError::QuotaExceeded`]
//! the way browser local storage does.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::HistoryError;

/// Storage that the history store persists into.
pub trait HistoryBackend: Send {
    /// Read the blob under `namespace`. `Ok(None)` if nothing is stored.
    fn get(&self, namespace: &str) -> Result<Option<Vec<u8>>, HistoryError>;

    /// Replace the blob under `namespace`.
    fn set(&mut self, namespace: &str, bytes: Vec<u8>) -> Result<(), HistoryError>;

    /// Remove the blob under `namespace`. Removing a missing entry succeeds.
    fn remove(&mut self, namespace: &str) -> Result<(), HistoryError>;
}

/// In-process backend, used by tests and ephemeral sessions.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    entries: HashMap<String, Vec<u8>>,
    capacity: usize,
}

impl MemoryBackend {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl HistoryBackend for MemoryBackend {
    fn get(&self, namespace: &str) -> Result<Option<Vec<u8>>, HistoryError> {
        Ok(self.entries.get(namespace).cloned())
    }

    fn set(&mut self, namespace: &str, bytes: Vec<u8>) -> Result<(), HistoryError> {
        let others: usize = self
            .entries
            .iter()
            .filter(|(k, _)| k.as_str() != namespace)
            .map(|(_, v)| v.len())
            .sum();
        check_quota(namespace, others + bytes.len(), self.capacity)?;
        self.entries.insert(namespace.to_string(), bytes);
        Ok(())
    }

    fn remove(&mut self, namespace: &str) -> Result<(), HistoryError> {
        self.entries.remove(namespace);
        Ok(())
    }
}

/// One JSON file per namespace inside a directory.
///
/// Writes go to a temp file and are renamed into place, so a crash never
/// leaves a half-written table behind.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
    capacity: usize,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            dir: dir.into(),
            capacity,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, namespace: &str) -> PathBuf {
        self.dir.join(format!("{namespace}.json"))
    }

    /// Bytes held by every namespace other than `namespace`.
    fn bytes_used_by_others(&self, namespace: &str) -> Result<usize, HistoryError> {
        let own = self.path(namespace);
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut total = 0usize;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            if path == own || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            total += entry.metadata()?.len() as usize;
        }
        Ok(total)
    }
}

impl HistoryBackend for FileBackend {
    fn get(&self, namespace: &str) -> Result<Option<Vec<u8>>, HistoryError> {
        match std::fs::read(self.path(namespace)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, namespace: &str, bytes: Vec<u8>) -> Result<(), HistoryError> {
        let others = self.bytes_used_by_others(namespace)?;
        check_quota(namespace, others + bytes.len(), self.capacity)?;

        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(namespace);
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &bytes)?;
        std::fs::rename(&tmp_path, &path)?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "history blob written");
        Ok(())
    }

    fn remove(&mut self, namespace: &str) -> Result<(), HistoryError> {
        match std::fs::remove_file(self.path(namespace)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn check_quota(namespace: &str, needed: usize, capacity: usize) -> Result<(), HistoryError> {
    if needed > capacity {
        return Err(HistoryError::QuotaExceeded {
            namespace: namespace.to_string(),
            needed,
            capacity,
        });
    }
    Ok(())
}
