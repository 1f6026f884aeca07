use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

use docqa_core::models::query::{QueryAnswer, QueryRequest};

use crate::client::ApiClient;
use crate::error::ClientError;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Anything that can answer a question about the stored documents.
///
/// The chat session depends on this rather than on `ApiClient` so it can be
/// driven without a server.
pub trait QueryService: Send + Sync {
    fn ask<'a>(
        &'a self,
        request: &'a QueryRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<QueryAnswer, ClientError>>;
}

impl QueryService for ApiClient {
    fn ask<'a>(
        &'a self,
        request: &'a QueryRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<QueryAnswer, ClientError>> {
        Box::pin(ApiClient::ask(self, request, cancel))
    }
}
