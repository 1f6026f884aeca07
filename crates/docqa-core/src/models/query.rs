use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::models::history::DocumentKey;

pub const DEFAULT_TOP_K: u32 = 5;
pub const MIN_TOP_K: u32 = 1;
pub const MAX_TOP_K: u32 = 50;

/// Body of `POST /api/query`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub question: String,
    pub top_k: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
}

impl QueryRequest {
    /// Build a validated request scoped to `document`.
    ///
    /// The question is trimmed; a blank question or an out-of-range
    /// `top_k` is rejected before anything reaches the network.
    pub fn new(question: &str, top_k: u32, document: &DocumentKey) -> Result<Self, CoreError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(CoreError::EmptyQuestion);
        }
        validate_top_k(top_k)?;
        Ok(Self {
            question: question.to_string(),
            top_k,
            source_file: document.source_file().map(str::to_string),
        })
    }
}

pub fn validate_top_k(top_k: u32) -> Result<u32, CoreError> {
    if (MIN_TOP_K..=MAX_TOP_K).contains(&top_k) {
        Ok(top_k)
    } else {
        Err(CoreError::InvalidTopK {
            value: top_k,
            min: MIN_TOP_K,
            max: MAX_TOP_K,
        })
    }
}

/// An answer with its source citations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryAnswer {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub num_contexts: Option<u32>,
}
