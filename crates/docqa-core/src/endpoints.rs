//! Backend endpoint conventions.
//!
//! Pure URL construction, no HTTP client. These define the canonical
//! layout of the document Q&A backend's routes.

use url::Url;

use crate::error::CoreError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Base of the event-run API used by the polling query flow.
pub const DEFAULT_EVENTS_URL: &str = "http://127.0.0.1:8288/v1";

/// Pick the first configured base URL: environment, then file, then default.
pub fn resolve_base<'a>(env: Option<&'a str>, configured: Option<&'a str>, default: &'a str) -> &'a str {
    [env, configured]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(default)
}

/// Resolved backend base URLs and the routes built from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    api: Url,
    events: Url,
}

impl ApiEndpoints {
    pub fn new(api_url: &str, events_url: &str) -> Result<Self, CoreError> {
        Ok(Self {
            api: parse_base(api_url)?,
            events: parse_base(events_url)?,
        })
    }

    pub fn api_base(&self) -> &Url {
        &self.api
    }

    pub fn events_base(&self) -> &Url {
        &self.events
    }

    pub fn upload(&self) -> Url {
        join(&self.api, &["api", "upload"])
    }

    pub fn query(&self) -> Url {
        join(&self.api, &["api", "query"])
    }

    pub fn files(&self) -> Url {
        join(&self.api, &["api", "files"])
    }

    pub fn rename(&self) -> Url {
        join(&self.api, &["api", "rename"])
    }

    pub fn health(&self) -> Url {
        join(&self.api, &["api", "health"])
    }

    /// The filename is percent-encoded as a single path segment.
    pub fn delete(&self, filename: &str) -> Url {
        join(&self.api, &["api", "delete", filename])
    }

    /// The filename is percent-encoded as a single path segment.
    pub fn download(&self, filename: &str) -> Url {
        join(&self.api, &["api", "download", filename])
    }

    /// Runs triggered by a queued query event.
    pub fn runs(&self, event_id: &str) -> Url {
        join(&self.events, &["events", event_id, "runs"])
    }
}

fn parse_base(raw: &str) -> Result<Url, CoreError> {
    let url = Url::parse(raw.trim())?;
    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(CoreError::UnsupportedBaseUrl(raw.to_string()));
    }
    Ok(url)
}

fn join(base: &Url, segments: &[&str]) -> Url {
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    // parse_base rejects cannot-be-a-base URLs, so this always succeeds.
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
