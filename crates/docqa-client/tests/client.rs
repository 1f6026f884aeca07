use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{body_json, body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docqa_client::error::ClientError;
use docqa_client::normalize::QueryOutcome;
use docqa_client::poll::PollPolicy;
use docqa_client::ApiClient;
use docqa_core::endpoints::ApiEndpoints;
use docqa_core::models::history::DocumentKey;
use docqa_core::models::query::QueryRequest;

fn fast_poll(max_attempts: u32) -> PollPolicy {
    PollPolicy {
        max_attempts,
        initial_delay_ms: 1,
        backoff_multiplier: 1.0,
        max_delay_ms: 5,
        jitter: false,
    }
}

fn client_for(server: &MockServer) -> ApiClient {
    let endpoints =
        ApiEndpoints::new(&server.uri(), &format!("{}/v1", server.uri())).unwrap();
    ApiClient::new(endpoints, Duration::from_secs(5))
        .unwrap()
        .with_poll_policy(fast_poll(5))
}

fn request(question: &str, doc: &str) -> QueryRequest {
    QueryRequest::new(question, 5, &DocumentKey::new(doc)).unwrap()
}

#[tokio::test]
async fn health_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy",
            "message": "RAG AI Agent API is running"
        })))
        .mount(&server)
        .await;

    let health = client_for(&server).health().await.unwrap();
    assert_eq!(health.status, "healthy");
}

#[tokio::test]
async fn list_files_accepts_names_and_objects() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "files": [
                "legacy.pdf",
                {
                    "name": "report.pdf",
                    "size": "1.2 MB",
                    "size_bytes": 1258291,
                    "upload_date": "2025-06-01 10:00:00",
                    "path": "uploads/report.pdf"
                }
            ]
        })))
        .mount(&server)
        .await;

    let files = client_for(&server).list_files().await.unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].name, "legacy.pdf");
    assert!(files[0].size_bytes.is_none());
    assert_eq!(files[1].name, "report.pdf");
    assert_eq!(files[1].size_bytes, Some(1_258_291));
    assert_eq!(files[1].size.as_deref(), Some("1.2 MB"));
}

#[tokio::test]
async fn upload_sends_multipart_pdf() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains("name=\"file\""))
        .and(body_string_contains("application/pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "filename": "paper.pdf",
            "file_id": "abc123",
            "status": "success",
            "message": "ingested 12 chunks"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("paper.pdf");
    std::fs::write(&pdf, b"%PDF-1.4 test").unwrap();

    let receipt = client_for(&server).upload(&pdf).await.unwrap();
    assert_eq!(receipt.document.name, "paper.pdf");
    assert_eq!(receipt.file_id.as_deref(), Some("abc123"));
    assert_eq!(receipt.message.as_deref(), Some("ingested 12 chunks"));
}

#[tokio::test]
async fn upload_normalizes_nested_file_object() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": { "filename": "stored.pdf", "size_bytes": 13 }
        })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let pdf = dir.path().join("local.PDF");
    std::fs::write(&pdf, b"%PDF-1.4 test").unwrap();

    let receipt = client_for(&server).upload(&pdf).await.unwrap();
    assert_eq!(receipt.document.name, "stored.pdf");
    assert_eq!(receipt.document.size_bytes, Some(13));
}

#[tokio::test]
async fn upload_rejects_non_pdf_without_a_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let txt = dir.path().join("notes.txt");
    std::fs::write(&txt, b"plain").unwrap();
    let client = client_for(&server);

    let err = client.upload(&txt).await.unwrap_err();
    assert!(matches!(err, ClientError::Validation(_)));

    let missing = dir.path().join("missing.pdf");
    let err = client.upload(&missing).await.unwrap_err();
    assert!(err.is_validation());
}

#[tokio::test]
async fn upload_many_continues_after_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "filename": "ok.pdf" })))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("ok.pdf");
    std::fs::write(&good, b"%PDF").unwrap();
    let bad = dir.path().join("bad.docx");
    std::fs::write(&bad, b"nope").unwrap();

    let results = client_for(&server)
        .upload_many(&[bad.clone(), good.clone()])
        .await;
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0, bad);
    assert!(results[0].1.is_err());
    assert!(results[1].1.is_ok());
}

#[tokio::test]
async fn delete_and_download_encode_filenames() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/delete/my%20report%3F.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "deleted" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/download/my%20report%3F.pdf"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"%PDF-1.7".to_vec()))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.delete("my report?.pdf").await.unwrap();
    let bytes = client.download("my report?.pdf").await.unwrap();
    assert_eq!(bytes, b"%PDF-1.7");
}

#[tokio::test]
async fn rename_sends_both_names() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/rename"))
        .and(body_json(json!({ "old_name": "a.pdf", "new_name": "b.pdf" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "new_name": "b.pdf" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.rename("a.pdf", " b.pdf ").await.unwrap(), "b.pdf");
    assert!(client.rename("a.pdf", "  ").await.unwrap_err().is_validation());
    assert!(client.rename("a.pdf", "a.pdf").await.unwrap_err().is_validation());
}

#[tokio::test]
async fn error_status_keeps_server_detail() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "detail": "File not found" })),
        )
        .mount(&server)
        .await;

    let err = client_for(&server).delete("gone.pdf").await.unwrap_err();
    match &err {
        ClientError::Status { status, detail } => {
            assert_eq!(*status, 404);
            assert_eq!(detail.as_deref(), Some("File not found"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    let classified = err.classify();
    assert_eq!(classified.message, "File not found");
    assert!(!classified.retryable);
}

#[tokio::test]
async fn query_scopes_to_document_and_returns_answer() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .and(body_json(json!({
            "question": "What is the refund window?",
            "top_k": 5,
            "source_file": "policy.pdf"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "30 days.",
            "sources": ["policy.pdf"],
            "num_contexts": 3
        })))
        .mount(&server)
        .await;

    let outcome = client_for(&server)
        .query(&request("  What is the refund window?  ", "policy.pdf"))
        .await
        .unwrap();
    match outcome {
        QueryOutcome::Answered(answer) => {
            assert_eq!(answer.answer, "30 days.");
            assert_eq!(answer.sources, vec!["policy.pdf".to_string()]);
            assert_eq!(answer.num_contexts, Some(3));
        }
        other => panic!("expected an inline answer, got {other:?}"),
    }
}

#[tokio::test]
async fn all_documents_query_omits_source_file() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .and(body_json(json!({ "question": "Summarize", "top_k": 5 })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answer": "Summary.",
            "sources": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let req = QueryRequest::new("Summarize", 5, &DocumentKey::all()).unwrap();
    let answer = client_for(&server)
        .ask(&req, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer.answer, "Summary.");
}

#[tokio::test]
async fn queued_query_is_polled_until_completed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "event_id": "evt-1" })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "status": "Running" }]
        })))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{
                "status": "Completed",
                "output": { "answer": "Forty-two.", "sources": ["guide.pdf"] }
            }]
        })))
        .mount(&server)
        .await;

    let answer = client_for(&server)
        .ask(&request("Meaning of life?", "guide.pdf"), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer.answer, "Forty-two.");
    assert_eq!(answer.sources, vec!["guide.pdf".to_string()]);
}

#[tokio::test]
async fn completed_run_without_answer_gets_placeholder() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-2/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "status": "Finished", "output": {} }]
        })))
        .mount(&server)
        .await;

    let answer = client_for(&server)
        .wait_for_run("evt-2", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer.answer, "No answer generated");
    assert!(answer.sources.is_empty());
}

#[tokio::test]
async fn failed_run_ends_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-3/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "status": "Failed" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .wait_for_run("evt-3", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::RunFailed(ref s) if s == "Failed"));
}

#[tokio::test]
async fn polling_gives_up_after_max_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-4/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server).with_poll_policy(fast_poll(3));
    let err = client
        .wait_for_run("evt-4", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::PollExhausted { attempts: 3 }));
}

#[tokio::test]
async fn polling_retries_transient_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-5/runs"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-5/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{ "status": "Succeeded", "output": { "answer": "ok" } }]
        })))
        .mount(&server)
        .await;

    let answer = client_for(&server)
        .wait_for_run("evt-5", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(answer.answer, "ok");
}

#[tokio::test]
async fn polling_stops_on_non_retryable_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-6/runs"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = client_for(&server)
        .wait_for_run("evt-6", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}

#[tokio::test]
async fn cancelled_token_stops_polling() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-7/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
        .mount(&server)
        .await;

    let slow = PollPolicy {
        max_attempts: 100,
        initial_delay_ms: 10_000,
        backoff_multiplier: 1.0,
        max_delay_ms: 10_000,
        jitter: false,
    };
    let client = client_for(&server).with_poll_policy(slow);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = client.wait_for_run("evt-7", &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));

    let already = CancellationToken::new();
    already.cancel();
    let err = client.wait_for_run("evt-7", &already).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
}

#[tokio::test]
async fn cancel_aborts_an_in_flight_poll_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/events/evt-9/runs"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "data": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).with_poll_policy(fast_poll(3));
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.wait_for_run("evt-9", &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn cancel_aborts_an_in_flight_query() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "answer": "late", "sources": [] }))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = client.ask(&request("Anything?", "manual.pdf"), &cancel).await.unwrap_err();
    assert!(matches!(err, ClientError::Cancelled));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn unreachable_server_is_a_connection_error() {
    let endpoints = ApiEndpoints::new("http://127.0.0.1:9", "http://127.0.0.1:9/v1").unwrap();
    let client = ApiClient::new(endpoints, Duration::from_secs(5)).unwrap();

    let err = client.list_files().await.unwrap_err();
    let classified = err.classify();
    assert!(classified.retryable);
    assert_eq!(classified.title, "Connection Error");
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "status": "healthy" }))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let endpoints = ApiEndpoints::new(&server.uri(), &server.uri()).unwrap();
    let client = ApiClient::new(endpoints, Duration::from_millis(100)).unwrap();
    let err = client.health().await.unwrap_err();
    assert!(matches!(err, ClientError::Timeout(_)));
    assert!(err.classify().retryable);
}
