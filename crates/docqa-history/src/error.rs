use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("storage quota exceeded for {namespace} ({needed} bytes needed, capacity {capacity})")]
    QuotaExceeded {
        namespace: String,
        needed: usize,
        capacity: usize,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl HistoryError {
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, HistoryError::QuotaExceeded { .. })
    }
}
