//! docqa-export
//!
//! Transcript exports: Markdown, plain text, JSON, a printable HTML page,
//! and DOCX rendered from the Markdown form. Exports are pure functions of
//! the document key, the messages and the export time.

pub mod docx;
pub mod error;
pub mod format;
pub mod html;
pub mod json;
pub mod markdown;
pub mod styles;
pub mod text;

use jiff::Timestamp;

/// Timestamps in exports: `2025-06-01 12:00:00 UTC`.
pub(crate) fn display_time(ts: Timestamp) -> String {
    ts.strftime("%Y-%m-%d %H:%M:%S UTC").to_string()
}
