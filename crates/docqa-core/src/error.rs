use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("url cannot be used as an API base: {0}")]
    UnsupportedBaseUrl(String),

    #[error("question must not be empty")]
    EmptyQuestion,

    #[error("top_k must be between {min} and {max}, got {value}")]
    InvalidTopK { value: u32, min: u32, max: u32 },
}
