//! The chat history store.
//!
//! Every operation reads the full table, changes it in memory and writes it
//! back. Reads sweep out records older than the retention window without
//! re-persisting; the next write naturally omits them. Nothing here returns
//! an error to the caller: failures are logged and surfaced only as status
//! values.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tracing::{debug, error, warn};

use docqa_core::models::history::{DocumentKey, HistoryRecord, HistoryTable};
use docqa_core::models::message::Message;

use crate::backend::HistoryBackend;
use crate::clock::{Clock, SystemClock};
use crate::error::HistoryError;
use crate::state;

/// Namespace the table is stored under.
pub const STORAGE_NAMESPACE: &str = "rag_chat_history";

/// Records idle for longer than this are dropped on read.
pub const RETENTION_DAYS: i64 = 30;

/// Capacity assumed for usage reporting (browser local storage's 5 MiB).
pub const DEFAULT_CAPACITY_BYTES: usize = 5 * 1024 * 1024;

/// What happened to a [`ChatHistoryStore::write`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved,
    /// Storage was full; the oldest other record was evicted to make room.
    SavedAfterEviction { evicted: DocumentKey },
    /// The write was lost. History is a convenience, so this is not an error.
    Dropped { reason: String },
}

impl WriteOutcome {
    pub fn is_saved(&self) -> bool {
        !matches!(self, WriteOutcome::Dropped { .. })
    }
}

/// Approximate storage footprint, for display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used: usize,
    pub capacity: usize,
    pub percentage: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct KeyExport<'a> {
    filename: &'a str,
    messages: &'a [Message],
    exported_at: Timestamp,
}

/// Per-document transcripts over an injected backend.
///
/// The backend sits behind a mutex so each read-modify-write is atomic,
/// which keeps "last write wins per key" even when shared across threads.
pub struct ChatHistoryStore<B> {
    backend: Mutex<B>,
    clock: Arc<dyn Clock>,
    namespace: String,
    capacity: usize,
    retention: SignedDuration,
}

impl<B: HistoryBackend> ChatHistoryStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend: Mutex::new(backend),
            clock: Arc::new(SystemClock),
            namespace: STORAGE_NAMESPACE.to_string(),
            capacity: DEFAULT_CAPACITY_BYTES,
            retention: SignedDuration::from_hours(24 * RETENTION_DAYS),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Capacity reported by [`usage`](Self::usage). Enforcement is the
    /// backend's job.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn into_backend(self) -> B {
        self.backend.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    /// The whole table, minus expired records. Missing or corrupt data reads
    /// as an empty table.
    pub fn read_all(&self) -> HistoryTable {
        let backend = self.lock();
        self.load(&*backend)
    }

    /// Messages for `key`, empty if there is no record.
    pub fn read(&self, key: &DocumentKey) -> Vec<Message> {
        self.read_all()
            .remove(key)
            .map(|record| record.messages)
            .unwrap_or_default()
    }

    /// Replace the record for `key` with `messages`, stamped now.
    ///
    /// If storage is full, the single globally-oldest record (which may be
    /// this key's previous one) is evicted and persisted, then the write is
    /// retried once. A second failure drops the write; the eviction stands.
    pub fn write(&self, key: &DocumentKey, messages: Vec<Message>) -> WriteOutcome {
        let mut backend = self.lock();
        let stored = self.load(&*backend);

        let now = self.clock.now();
        // lastUpdated never moves backwards for a key, even if the clock does.
        let last_updated = stored
            .get(key)
            .map_or(now, |existing| existing.last_updated.max(now));
        let record = HistoryRecord {
            messages,
            last_updated,
        };

        let mut table = stored.clone();
        table.insert(key.clone(), record.clone());

        let first = match self.persist(&mut *backend, &table) {
            Ok(()) => return WriteOutcome::Saved,
            Err(e) => e,
        };

        if !first.is_quota_exceeded() {
            error!(key = %key.as_str(), error = %first, "failed to save chat history");
            return WriteOutcome::Dropped {
                reason: first.to_string(),
            };
        }

        let mut table = stored;
        let Some(victim) = oldest_key(&table) else {
            error!(key = %key.as_str(), error = %first, "history full and nothing to evict");
            return WriteOutcome::Dropped {
                reason: first.to_string(),
            };
        };

        warn!(key = %key.as_str(), evicted = %victim.as_str(), "history full, evicting oldest record");
        table.remove(&victim);
        if let Err(e) = self.persist(&mut *backend, &table) {
            warn!(evicted = %victim.as_str(), error = %e, "failed to persist eviction");
        }

        table.insert(key.clone(), record);
        match self.persist(&mut *backend, &table) {
            Ok(()) => WriteOutcome::SavedAfterEviction { evicted: victim },
            Err(retry) => {
                error!(key = %key.as_str(), error = %retry, "failed to save chat history after eviction");
                WriteOutcome::Dropped {
                    reason: retry.to_string(),
                }
            }
        }
    }

    /// Remove the record for `key`. Absent keys are a no-op.
    /// Returns `false` only if persisting the removal failed.
    pub fn delete(&self, key: &DocumentKey) -> bool {
        let mut backend = self.lock();
        let mut table = self.load(&*backend);
        if table.remove(key).is_none() {
            return true;
        }
        match self.persist(&mut *backend, &table) {
            Ok(()) => true,
            Err(e) => {
                warn!(key = %key.as_str(), error = %e, "failed to clear chat history");
                false
            }
        }
    }

    /// Clear every record.
    pub fn delete_all(&self) -> bool {
        let mut backend = self.lock();
        match backend.remove(&self.namespace) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "failed to clear all chat history");
                false
            }
        }
    }

    /// Keys with live records, most recently updated first.
    pub fn list_keys_by_recency(&self) -> Vec<DocumentKey> {
        let mut records: Vec<(DocumentKey, Timestamp)> = self
            .read_all()
            .into_iter()
            .map(|(key, record)| (key, record.last_updated))
            .collect();
        records.sort_by(|(ka, ta), (kb, tb)| tb.cmp(ta).then_with(|| ka.cmp(kb)));
        records.into_iter().map(|(key, _)| key).collect()
    }

    /// Size of the stored blob against the assumed capacity.
    pub fn usage(&self) -> StorageUsage {
        let used = match self.lock().get(&self.namespace) {
            Ok(bytes) => bytes.map_or(0, |b| b.len()),
            Err(e) => {
                warn!(error = %e, "failed to read history for usage");
                0
            }
        };
        let percentage = if self.capacity == 0 {
            0.0
        } else {
            used as f64 / self.capacity as f64 * 100.0
        };
        StorageUsage {
            used,
            capacity: self.capacity,
            percentage,
        }
    }

    /// One document's history as pretty JSON: `{filename, messages, exportedAt}`.
    pub fn export_key(&self, key: &DocumentKey) -> Result<String, HistoryError> {
        let messages = self.read(key);
        let export = KeyExport {
            filename: key.as_str(),
            messages: &messages,
            exported_at: self.clock.now(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }

    fn lock(&self) -> MutexGuard<'_, B> {
        self.backend.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn load(&self, backend: &B) -> HistoryTable {
        let mut table = match state::load_table(backend, &self.namespace) {
            Ok(Some(table)) => table,
            Ok(None) => return HistoryTable::new(),
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "unreadable chat history, treating as empty");
                return HistoryTable::new();
            }
        };

        let now = self.clock.now();
        let before = table.len();
        table.retain(|_, record| !self.is_expired(record, now));
        if table.len() < before {
            debug!(expired = before - table.len(), "swept expired chat history");
        }
        table
    }

    /// Strictly older than the retention window. A record exactly at the
    /// boundary is still live.
    fn is_expired(&self, record: &HistoryRecord, now: Timestamp) -> bool {
        now.duration_since(record.last_updated) > self.retention
    }

    fn persist(&self, backend: &mut B, table: &HistoryTable) -> Result<(), HistoryError> {
        let bytes = state::save_table(backend, &self.namespace, table)?;
        debug!(records = table.len(), bytes, "chat history persisted");
        Ok(())
    }
}

/// The record with the oldest `lastUpdated` across all keys. Ties go to the
/// smallest key.
fn oldest_key(table: &HistoryTable) -> Option<DocumentKey> {
    table
        .iter()
        .min_by(|(ka, ra), (kb, rb)| ra.last_updated.cmp(&rb.last_updated).then_with(|| ka.cmp(kb)))
        .map(|(key, _)| key.clone())
}
