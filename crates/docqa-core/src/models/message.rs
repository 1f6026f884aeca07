use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single message in a document conversation.
///
/// Messages are immutable once created. A transcript is ordered by
/// conversation order, which is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub timestamp: jiff::Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<String>>,
}

/// Role of a message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Display name used in transcripts and exports.
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "AI Assistant",
        }
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Role::User => "\u{1F464}",
            Role::Assistant => "\u{1F916}",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl Message {
    pub fn user(content: impl Into<String>, timestamp: jiff::Timestamp) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            timestamp,
            sources: None,
        }
    }

    /// An assistant reply. An empty source list is stored as `None` so the
    /// at-rest form omits the field, matching replies that carried none.
    pub fn assistant(
        content: impl Into<String>,
        sources: Vec<String>,
        timestamp: jiff::Timestamp,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            timestamp,
            sources: if sources.is_empty() { None } else { Some(sources) },
        }
    }

    /// Sources as a slice, empty when the message has none.
    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or_default()
    }
}
