use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::message::Message;

/// Partition key for chat history: a document filename, or the sentinel
/// meaning "all documents".
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentKey(String);

impl DocumentKey {
    /// Stored form of the "all documents" sentinel.
    pub const ALL_DOCUMENTS: &'static str = "__all_documents__";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn all() -> Self {
        Self(Self::ALL_DOCUMENTS.to_string())
    }

    pub fn is_all(&self) -> bool {
        self.0 == Self::ALL_DOCUMENTS
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The `source_file` to scope a query with, `None` for all documents.
    pub fn source_file(&self) -> Option<&str> {
        if self.is_all() { None } else { Some(&self.0) }
    }

    /// Human-readable name for titles and export headers.
    pub fn display_name(&self) -> &str {
        if self.is_all() { "All Documents" } else { &self.0 }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl From<&str> for DocumentKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for DocumentKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// One document's persisted transcript.
///
/// Overwritten wholesale on every save; never partially merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub messages: Vec<Message>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: jiff::Timestamp,
}

/// Every persisted transcript, keyed by document. The whole table is the
/// unit of persistence.
pub type HistoryTable = BTreeMap<DocumentKey, HistoryRecord>;
