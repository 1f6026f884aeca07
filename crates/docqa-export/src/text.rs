use jiff::Timestamp;

use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::Message;

use crate::display_time;

const RULE_WIDTH: usize = 60;

pub fn to_text(document: &DocumentKey, messages: &[Message], exported_at: Timestamp) -> String {
    let mut text = format!("Chat History: {}\n", document.display_name());
    text.push_str(&format!("Exported: {}\n", display_time(exported_at)));
    text.push_str(&"=".repeat(RULE_WIDTH));
    text.push_str("\n\n");

    for message in messages {
        text.push_str(&format!(
            "{} ({}):\n",
            message.role.label(),
            display_time(message.timestamp)
        ));
        text.push_str(&message.content);
        text.push('\n');

        if !message.sources().is_empty() {
            text.push_str("\nSources:\n");
            for source in message.sources() {
                text.push_str(&format!("- {source}\n"));
            }
        }

        text.push('\n');
        text.push_str(&"-".repeat(RULE_WIDTH));
        text.push_str("\n\n");
    }

    text
}
