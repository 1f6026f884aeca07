use docqa_core::error::CoreError;
use thiserror::Error;

use crate::classify::{Classified, Failure, classify};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("server responded with status {status}")]
    Status { status: u16, detail: Option<String> },

    #[error("could not reach the server: {0}")]
    Connect(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("Query failed: {0}")]
    RunFailed(String),

    #[error("no answer after {attempts} polling attempts")]
    PollExhausted { attempts: u32 },

    #[error("polling cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ClientError::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() {
            ClientError::Connect(e.to_string())
        } else if e.is_decode() || e.is_body() {
            ClientError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ClientError::Status {
                status: status.as_u16(),
                detail: None,
            }
        } else {
            ClientError::Http(e.to_string())
        }
    }
}

impl ClientError {
    /// The shape of this failure as the classifier sees it.
    pub fn failure(&self) -> Failure {
        match self {
            ClientError::Status { status, detail } => Failure::Status {
                status: *status,
                detail: detail.clone(),
            },
            ClientError::Connect(_) => Failure::Connect,
            ClientError::Timeout(_) => Failure::Timeout,
            other => Failure::Other(other.to_string()),
        }
    }

    /// Whether this error was raised before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_)
                | ClientError::Core(CoreError::EmptyQuestion)
                | ClientError::Core(CoreError::InvalidTopK { .. })
        )
    }

    /// User-facing title, message and retryability.
    ///
    /// Validation errors keep their own wording; they never went over the
    /// wire so the transport categories do not apply.
    pub fn classify(&self) -> Classified {
        if self.is_validation() {
            return Classified {
                title: "Error",
                message: self.to_string(),
                retryable: false,
            };
        }
        classify(&self.failure())
    }
}
