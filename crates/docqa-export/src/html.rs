use jiff::Timestamp;
use serde::Serialize;
use tera::{Context, Tera};

use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::Message;

use crate::display_time;
use crate::error::ExportError;

/// The `.html` suffix turns on Tera's autoescaping for every `{{ }}`.
const TEMPLATE_NAME: &str = "chat.html";
const TEMPLATE: &str = include_str!("../templates/chat.html");

#[derive(Serialize)]
struct HtmlMessage<'a> {
    role: &'static str,
    emoji: &'static str,
    label: &'static str,
    timestamp: String,
    content: &'a str,
    sources: &'a [String],
}

#[derive(Serialize)]
struct HtmlContext<'a> {
    document: &'a str,
    exported_at: String,
    message_count: usize,
    messages: Vec<HtmlMessage<'a>>,
}

/// Render a self-contained, printable HTML page.
///
/// Message content and sources are HTML-escaped, so document text echoed
/// back by the backend cannot inject markup.
pub fn to_html(
    document: &DocumentKey,
    messages: &[Message],
    exported_at: Timestamp,
) -> Result<String, ExportError> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, TEMPLATE)
        .map_err(|e| ExportError::TemplateParse(e.to_string()))?;

    let ctx = HtmlContext {
        document: document.display_name(),
        exported_at: display_time(exported_at),
        message_count: messages.len(),
        messages: messages
            .iter()
            .map(|m| HtmlMessage {
                role: m.role.as_str(),
                emoji: m.role.emoji(),
                label: m.role.label(),
                timestamp: display_time(m.timestamp),
                content: &m.content,
                sources: m.sources(),
            })
            .collect(),
    };

    let context = Context::from_serialize(&ctx)?;
    let rendered = tera.render(TEMPLATE_NAME, &context)?;
    Ok(rendered)
}
