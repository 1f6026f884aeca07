//! Wire shapes the backend is known to answer with, and their mapping onto
//! the normalized domain types.

use serde::Deserialize;

use docqa_core::models::document::{Document, UploadReceipt};
use docqa_core::models::query::QueryAnswer;

const NO_ANSWER: &str = "No answer generated";
const SUCCESS_STATUSES: [&str; 4] = ["Completed", "Succeeded", "Success", "Finished"];
const FAILURE_STATUSES: [&str; 2] = ["Failed", "Cancelled"];

/// A file entry is either a bare name or a detailed object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawFileEntry {
    Name(String),
    Detailed(RawDocument),
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDocument {
    #[serde(alias = "filename")]
    name: String,
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    size_bytes: Option<u64>,
    #[serde(default)]
    upload_date: Option<String>,
    #[serde(default)]
    path: Option<String>,
}

impl From<RawDocument> for Document {
    fn from(raw: RawDocument) -> Self {
        Document {
            name: raw.name,
            size: raw.size,
            size_bytes: raw.size_bytes,
            upload_date: raw.upload_date,
            path: raw.path,
        }
    }
}

impl From<RawFileEntry> for Document {
    fn from(entry: RawFileEntry) -> Self {
        match entry {
            RawFileEntry::Name(name) => Document::named(name),
            RawFileEntry::Detailed(raw) => raw.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilesResponse {
    #[serde(default)]
    files: Vec<RawFileEntry>,
}

pub(crate) fn documents(response: FilesResponse) -> Vec<Document> {
    response.files.into_iter().map(Document::from).collect()
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct UploadResponse {
    #[serde(default)]
    filename: Option<String>,
    #[serde(default)]
    file_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    file: Option<RawFileEntry>,
}

/// Fold an upload response into a receipt. The `file` field wins over
/// `filename`; `local_name` is used when the backend named neither.
pub(crate) fn upload_receipt(response: UploadResponse, local_name: &str) -> UploadReceipt {
    let document = match (response.file, response.filename) {
        (Some(entry), _) => Document::from(entry),
        (None, Some(filename)) => Document::named(filename),
        (None, None) => Document::named(local_name),
    };
    UploadReceipt {
        document,
        file_id: response.file_id,
        status: response.status,
        message: response.message,
    }
}

/// `/api/query` either answers directly or hands back an event id whose
/// run must be polled.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum QueryResponse {
    Answered(QueryAnswer),
    Queued { event_id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryOutcome {
    Answered(QueryAnswer),
    Queued { event_id: String },
}

impl From<QueryResponse> for QueryOutcome {
    fn from(response: QueryResponse) -> Self {
        match response {
            QueryResponse::Answered(answer) => QueryOutcome::Answered(answer),
            QueryResponse::Queued { event_id } => QueryOutcome::Queued { event_id },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct RunsResponse {
    #[serde(default)]
    data: Vec<RunRecord>,
}

#[derive(Debug, Deserialize)]
struct RunRecord {
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Option<RunOutput>,
}

#[derive(Debug, Default, Deserialize)]
struct RunOutput {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RunState {
    Pending,
    Finished(QueryAnswer),
    Failed(String),
}

/// State of the first run for an event. No runs yet counts as pending.
pub(crate) fn run_state(response: RunsResponse) -> RunState {
    let Some(run) = response.data.into_iter().next() else {
        return RunState::Pending;
    };
    let status = run.status.as_str();
    if SUCCESS_STATUSES.contains(&status) {
        let output = run.output.unwrap_or_default();
        RunState::Finished(QueryAnswer {
            answer: output
                .answer
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| NO_ANSWER.to_string()),
            sources: output.sources,
            num_contexts: None,
        })
    } else if FAILURE_STATUSES.contains(&status) {
        RunState::Failed(run.status)
    } else {
        RunState::Pending
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// The `detail` of an error body, when it is a non-empty string.
pub(crate) fn error_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s),
        _ => None,
    }
}
