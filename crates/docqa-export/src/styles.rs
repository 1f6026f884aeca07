use serde::{Deserialize, Serialize};

/// Fonts and sizes for DOCX transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentStyles {
    /// Font for body text (e.g. "Calibri").
    pub body_font: String,

    /// Font for headings.
    pub heading_font: String,

    /// Body text font size in points.
    pub body_size: usize,

    /// Heading 1 font size in points. Used for the transcript title.
    pub heading1_size: usize,

    /// Heading 2 font size in points. Used for each message header.
    pub heading2_size: usize,

    /// Heading 3 font size in points.
    pub heading3_size: usize,
}

impl Default for DocumentStyles {
    fn default() -> Self {
        Self {
            body_font: "Calibri".to_string(),
            heading_font: "Arial".to_string(),
            body_size: 11,
            heading1_size: 18,
            heading2_size: 13,
            heading3_size: 12,
        }
    }
}
