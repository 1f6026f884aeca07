use docqa_core::error::CoreError;
use docqa_core::models::history::{DocumentKey, HistoryRecord, HistoryTable};
use docqa_core::models::message::{Message, Role};
use docqa_core::models::query::QueryRequest;

fn ts(s: &str) -> jiff::Timestamp {
    s.parse().unwrap()
}

#[test]
fn message_uses_type_field_and_omits_missing_sources() {
    let msg = Message::user("What is chapter 2 about?", ts("2025-03-01T10:00:00Z"));
    let json = serde_json::to_value(&msg).unwrap();
    assert_eq!(json["type"], "user");
    assert_eq!(json["timestamp"], "2025-03-01T10:00:00Z");
    assert!(json.get("sources").is_none());
}

#[test]
fn stored_messages_from_browser_clients_parse() {
    let raw = r#"{
        "id": "1712345678901",
        "type": "assistant",
        "content": "It covers setup.",
        "timestamp": "2025-03-01T10:00:01.123Z",
        "sources": ["manual.pdf"]
    }"#;
    let msg: Message = serde_json::from_str(raw).unwrap();
    assert_eq!(msg.role, Role::Assistant);
    assert_eq!(msg.sources(), ["manual.pdf".to_string()]);
    assert_eq!(msg.timestamp, ts("2025-03-01T10:00:01.123Z"));
}

#[test]
fn assistant_without_sources_stores_none() {
    let msg = Message::assistant("No idea.", Vec::new(), ts("2025-03-01T10:00:00Z"));
    assert_eq!(msg.sources, None);
    assert!(msg.sources().is_empty());
}

#[test]
fn history_table_serializes_as_object_keyed_by_document() {
    let mut table = HistoryTable::new();
    table.insert(
        DocumentKey::new("manual.pdf"),
        HistoryRecord {
            messages: vec![],
            last_updated: ts("2025-03-01T10:00:00Z"),
        },
    );
    let json = serde_json::to_value(&table).unwrap();
    assert_eq!(json["manual.pdf"]["lastUpdated"], "2025-03-01T10:00:00Z");
    assert!(json["manual.pdf"]["messages"].as_array().unwrap().is_empty());
}

#[test]
fn all_documents_key_drops_source_file() {
    let req = QueryRequest::new("  summarize  ", 5, &DocumentKey::all()).unwrap();
    assert_eq!(req.question, "summarize");
    assert_eq!(req.source_file, None);
    let json = serde_json::to_value(&req).unwrap();
    assert!(json.get("source_file").is_none());

    let req = QueryRequest::new("summarize", 3, &DocumentKey::new("manual.pdf")).unwrap();
    assert_eq!(req.source_file.as_deref(), Some("manual.pdf"));
}

#[test]
fn blank_question_and_bad_top_k_are_rejected() {
    let key = DocumentKey::new("manual.pdf");
    assert!(matches!(QueryRequest::new("   ", 5, &key), Err(CoreError::EmptyQuestion)));
    assert!(matches!(
        QueryRequest::new("hi", 0, &key),
        Err(CoreError::InvalidTopK { value: 0, .. })
    ));
    assert!(QueryRequest::new("hi", 51, &key).is_err());
}
