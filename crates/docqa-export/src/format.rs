use std::fmt;
use std::str::FromStr;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::Message;

use crate::docx::to_docx;
use crate::error::ExportError;
use crate::html::to_html;
use crate::json::to_json;
use crate::markdown::to_markdown;
use crate::styles::DocumentStyles;
use crate::text::to_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Markdown,
    Text,
    Json,
    Html,
    Docx,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Markdown,
        ExportFormat::Text,
        ExportFormat::Json,
        ExportFormat::Html,
        ExportFormat::Docx,
    ];

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "md",
            ExportFormat::Text => "txt",
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Docx => "docx",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Markdown => "text/markdown",
            ExportFormat::Text => "text/plain",
            ExportFormat::Json => "application/json",
            ExportFormat::Html => "text/html",
            ExportFormat::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "txt" | "text" => Ok(ExportFormat::Text),
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            "docx" => Ok(ExportFormat::Docx),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// A rendered export ready to be written or downloaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportArtifact {
    pub filename: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// `<document>_chat.<ext>`, with `all_documents` standing in for the sentinel.
///
/// The result is always a single path component: separators and characters
/// that filesystems reject become `_`, and leading dots are dropped.
pub fn artifact_filename(document: &DocumentKey, format: ExportFormat) -> String {
    let stem = if document.is_all() {
        "all_documents".to_string()
    } else {
        sanitize_stem(document.as_str())
    };
    format!("{stem}_chat.{}", format.extension())
}

fn sanitize_stem(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim_start_matches('.');
    if trimmed.is_empty() {
        "document".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Render `messages` in `format`.
///
/// An empty transcript still produces a valid artifact with just the header.
pub fn export(
    format: ExportFormat,
    document: &DocumentKey,
    messages: &[Message],
    exported_at: Timestamp,
) -> Result<ExportArtifact, ExportError> {
    let bytes = match format {
        ExportFormat::Markdown => to_markdown(document, messages, exported_at).into_bytes(),
        ExportFormat::Text => to_text(document, messages, exported_at).into_bytes(),
        ExportFormat::Json => to_json(document, messages, exported_at)?.into_bytes(),
        ExportFormat::Html => to_html(document, messages, exported_at)?.into_bytes(),
        ExportFormat::Docx => {
            to_docx(document, messages, exported_at, &DocumentStyles::default())?
        }
    };

    tracing::debug!(
        document = %document.as_str(),
        format = %format,
        messages = messages.len(),
        bytes = bytes.len(),
        "rendered chat export"
    );

    Ok(ExportArtifact {
        filename: artifact_filename(document, format),
        content_type: format.content_type(),
        bytes,
    })
}
