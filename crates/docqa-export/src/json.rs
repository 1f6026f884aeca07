use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::{Message, Role};

use crate::error::ExportError;

/// The JSON export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatExport {
    pub document: String,
    pub exported_at: Timestamp,
    pub message_count: usize,
    pub messages: Vec<ExportedMessage>,
}

/// A message in the JSON export. `sources` is always present, empty when
/// the message cited nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedMessage {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: Timestamp,
    pub sources: Vec<String>,
}

impl From<&Message> for ExportedMessage {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role,
            content: message.content.clone(),
            timestamp: message.timestamp,
            sources: message.sources().to_vec(),
        }
    }
}

pub fn to_json(
    document: &DocumentKey,
    messages: &[Message],
    exported_at: Timestamp,
) -> Result<String, ExportError> {
    let export = ChatExport {
        document: document.display_name().to_string(),
        exported_at,
        message_count: messages.len(),
        messages: messages.iter().map(ExportedMessage::from).collect(),
    };
    Ok(serde_json::to_string_pretty(&export)?)
}
