use jiff::Timestamp;

use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::Message;

use crate::display_time;

/// Render a transcript as Markdown: one `##` section per message, sources
/// as a bullet list, messages separated by `---`.
pub fn to_markdown(document: &DocumentKey, messages: &[Message], exported_at: Timestamp) -> String {
    let mut md = format!("# Chat History: {}\n\n", document.display_name());
    md.push_str(&format!("**Exported:** {}\n\n", display_time(exported_at)));
    md.push_str("---\n\n");

    for message in messages {
        md.push_str(&format!("## {} {}\n", message.role.emoji(), message.role.label()));
        md.push_str(&format!("*{}*\n\n", display_time(message.timestamp)));
        md.push_str(&message.content);
        md.push_str("\n\n");

        if !message.sources().is_empty() {
            md.push_str("**Sources:**\n");
            for source in message.sources() {
                md.push_str(&format!("- {source}\n"));
            }
            md.push('\n');
        }

        md.push_str("---\n\n");
    }

    md
}
