use serde::{Deserialize, Serialize};

/// A document stored by the backend.
///
/// This is the single normalized shape for file listings and upload
/// receipts, whatever shape the backend answered with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub name: String,
    /// Human-readable size as reported by the backend, e.g. `"1.2 MB"`.
    pub size: Option<String>,
    pub size_bytes: Option<u64>,
    pub upload_date: Option<String>,
    pub path: Option<String>,
}

impl Document {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            size_bytes: None,
            upload_date: None,
            path: None,
        }
    }
}

/// Result of uploading a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadReceipt {
    pub document: Document,
    pub file_id: Option<String>,
    pub status: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameRequest {
    pub old_name: String,
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameResponse {
    pub new_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub message: String,
}
