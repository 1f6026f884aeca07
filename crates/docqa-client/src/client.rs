use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::Response;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use docqa_core::endpoints::ApiEndpoints;
use docqa_core::models::document::{
    Document, HealthStatus, RenameRequest, RenameResponse, UploadReceipt,
};
use docqa_core::models::query::{QueryAnswer, QueryRequest};

use crate::error::ClientError;
use crate::normalize::{
    self, FilesResponse, QueryOutcome, QueryResponse, RunState, RunsResponse, UploadResponse,
};
use crate::poll::PollPolicy;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for the document Q&A backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    endpoints: ApiEndpoints,
    poll: PollPolicy,
}

impl ApiClient {
    pub fn new(endpoints: ApiEndpoints, timeout: Duration) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("docqa/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(Self {
            http,
            endpoints,
            poll: PollPolicy::default(),
        })
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn endpoints(&self) -> &ApiEndpoints {
        &self.endpoints
    }

    pub async fn health(&self) -> Result<HealthStatus, ClientError> {
        let resp = self.http.get(self.endpoints.health()).send().await?;
        Ok(check(resp).await?.json().await?)
    }

    pub async fn list_files(&self) -> Result<Vec<Document>, ClientError> {
        let resp = self.http.get(self.endpoints.files()).send().await?;
        let files: FilesResponse = check(resp).await?.json().await?;
        let documents = normalize::documents(files);
        debug!(count = documents.len(), "listed documents");
        Ok(documents)
    }

    /// Upload one PDF as the multipart `file` field.
    ///
    /// The path must name an existing file with a `.pdf` extension; anything
    /// else is rejected without touching the network.
    pub async fn upload(&self, path: &Path) -> Result<UploadReceipt, ClientError> {
        let name = validate_pdf_path(path)?;
        let bytes = tokio::fs::read(path).await?;
        let size = bytes.len();

        let part = Part::bytes(bytes)
            .file_name(name.clone())
            .mime_str("application/pdf")
            .map_err(|e| ClientError::Http(e.to_string()))?;
        let form = Form::new().part("file", part);

        let resp = self
            .http
            .post(self.endpoints.upload())
            .multipart(form)
            .send()
            .await?;
        let body: UploadResponse = check(resp).await?.json().await?;
        let receipt = normalize::upload_receipt(body, &name);

        info!(file = %name, bytes = size, stored_as = %receipt.document.name, "uploaded document");
        Ok(receipt)
    }

    /// Upload several files one after another. A failure does not stop the
    /// batch; each file gets its own result, in input order.
    pub async fn upload_many(
        &self,
        paths: &[PathBuf],
    ) -> Vec<(PathBuf, Result<UploadReceipt, ClientError>)> {
        let mut results = Vec::with_capacity(paths.len());
        for path in paths {
            let result = self.upload(path).await;
            if let Err(e) = &result {
                warn!(path = %path.display(), error = %e, "upload failed");
            }
            results.push((path.clone(), result));
        }
        results
    }

    pub async fn delete(&self, filename: &str) -> Result<(), ClientError> {
        let resp = self
            .http
            .delete(self.endpoints.delete(filename))
            .send()
            .await?;
        check(resp).await?;
        info!(file = %filename, "deleted document");
        Ok(())
    }

    /// Rename a stored document and return the name the backend settled on.
    pub async fn rename(&self, old_name: &str, new_name: &str) -> Result<String, ClientError> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            return Err(ClientError::Validation(
                "new document name must not be empty".to_string(),
            ));
        }
        if new_name == old_name {
            return Err(ClientError::Validation(
                "new document name is the same as the current one".to_string(),
            ));
        }

        let body = RenameRequest {
            old_name: old_name.to_string(),
            new_name: new_name.to_string(),
        };
        let resp = self
            .http
            .put(self.endpoints.rename())
            .json(&body)
            .send()
            .await?;
        let renamed: RenameResponse = check(resp).await?.json().await?;
        info!(from = %old_name, to = %renamed.new_name, "renamed document");
        Ok(renamed.new_name)
    }

    /// Fetch a stored document's raw bytes.
    pub async fn download(&self, filename: &str) -> Result<Vec<u8>, ClientError> {
        let resp = self
            .http
            .get(self.endpoints.download(filename))
            .send()
            .await?;
        let bytes = check(resp).await?.bytes().await?;
        Ok(bytes.to_vec())
    }

    /// Send a query. The backend either answers inline or queues a run.
    pub async fn query(&self, request: &QueryRequest) -> Result<QueryOutcome, ClientError> {
        debug!(
            top_k = request.top_k,
            source_file = request.source_file.as_deref().unwrap_or("*"),
            "sending query"
        );
        let resp = self
            .http
            .post(self.endpoints.query())
            .json(request)
            .send()
            .await?;
        let body: QueryResponse = check(resp).await?.json().await?;
        Ok(body.into())
    }

    /// Poll the runs for `event_id` until one finishes, fails, the attempts
    /// run out, or `cancel` fires.
    ///
    /// Transient failures while polling count as an attempt and are retried;
    /// anything else ends the poll.
    pub async fn wait_for_run(
        &self,
        event_id: &str,
        cancel: &CancellationToken,
    ) -> Result<QueryAnswer, ClientError> {
        let url = self.endpoints.runs(event_id);
        let attempts = self.poll.max_attempts;

        for attempt in 0..attempts {
            if cancel.is_cancelled() {
                return Err(ClientError::Cancelled);
            }

            let state = tokio::select! {
                _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                state = self.fetch_run_state(url.clone()) => state,
            };

            match state {
                Ok(RunState::Finished(answer)) => {
                    debug!(event_id, attempt, "run finished");
                    return Ok(answer);
                }
                Ok(RunState::Failed(status)) => return Err(ClientError::RunFailed(status)),
                Ok(RunState::Pending) => {}
                Err(e) if e.classify().retryable => {
                    warn!(event_id, attempt, error = %e, "polling failed, retrying");
                }
                Err(e) => return Err(e),
            }

            if attempt + 1 < attempts {
                let delay = self.poll.delay_for_attempt(attempt);
                tokio::select! {
                    _ = cancel.cancelled() => return Err(ClientError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }

        Err(ClientError::PollExhausted { attempts })
    }

    /// Query and, when the backend queues a run, wait for it. Cancelling the
    /// token aborts whichever request is in flight.
    pub async fn ask(
        &self,
        request: &QueryRequest,
        cancel: &CancellationToken,
    ) -> Result<QueryAnswer, ClientError> {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(ClientError::Cancelled),
            outcome = self.query(request) => outcome?,
        };

        match outcome {
            QueryOutcome::Answered(answer) => Ok(answer),
            QueryOutcome::Queued { event_id } => {
                info!(event_id = %event_id, "query queued, polling for result");
                self.wait_for_run(&event_id, cancel).await
            }
        }
    }

    async fn fetch_run_state(&self, url: url::Url) -> Result<RunState, ClientError> {
        let resp = self.http.get(url).send().await?;
        let runs: RunsResponse = check(resp).await?.json().await?;
        Ok(normalize::run_state(runs))
    }
}

/// Turn a non-success response into `ClientError::Status`, keeping the
/// server's `detail` when the body carries one.
async fn check(resp: Response) -> Result<Response, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ClientError::Status {
        status: status.as_u16(),
        detail: normalize::error_detail(&body),
    })
}

/// File name of an uploadable PDF, or a validation error.
fn validate_pdf_path(path: &Path) -> Result<String, ClientError> {
    let is_pdf = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(ClientError::Validation(format!(
            "{} is not a PDF file; only .pdf uploads are supported",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(ClientError::Validation(format!(
            "{} does not exist or is not a file",
            path.display()
        )));
    }
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            ClientError::Validation(format!("{} has no usable file name", path.display()))
        })
}
