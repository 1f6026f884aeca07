//! The chat session controller.
//!
//! A session owns the in-memory transcript for one document, persists it
//! after every change, and turns query results (or failures) into
//! transcript entries. Queries are split into [`ChatSession::prepare`] and
//! [`ChatSession::finish`] so several can be in flight at once; the
//! session generation tells late answers from a previous document or a
//! cleared transcript apart from current ones.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use docqa_client::classify::Classified;
use docqa_client::error::ClientError;
use docqa_client::service::QueryService;
use docqa_core::error::CoreError;
use docqa_core::models::history::DocumentKey;
use docqa_core::models::message::Message;
use docqa_core::models::query::{QueryAnswer, QueryRequest, validate_top_k};
use docqa_export::error::ExportError;
use docqa_export::format::{ExportArtifact, ExportFormat, export};
use docqa_history::backend::HistoryBackend;
use docqa_history::clock::Clock;
use docqa_history::store::{ChatHistoryStore, WriteOutcome};

pub const ERROR_PREFIX: &str = "Sorry, I encountered an error: ";

/// A question that has been recorded and sent, awaiting its answer.
#[derive(Debug, Clone)]
pub struct PendingQuery {
    generation: u64,
    question_id: String,
    request: QueryRequest,
}

impl PendingQuery {
    pub fn request(&self) -> &QueryRequest {
        &self.request
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// What happened to a finished query.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// The answer was added to the transcript.
    Answered(Message),
    /// The query failed. `message` is the synthetic reply added to the
    /// transcript; `notice` is the one notification to show for it.
    Failed { notice: Classified, message: Message },
    /// The session moved on (document switch or clear) before the answer
    /// arrived. Nothing was added.
    Stale,
}

pub struct ChatSession<B> {
    store: Arc<ChatHistoryStore<B>>,
    clock: Arc<dyn Clock>,
    document: DocumentKey,
    top_k: u32,
    messages: Vec<Message>,
    generation: u64,
}

impl<B: HistoryBackend> ChatSession<B> {
    /// Open a session on `document`, restoring its saved transcript.
    pub fn open(
        store: Arc<ChatHistoryStore<B>>,
        clock: Arc<dyn Clock>,
        document: DocumentKey,
        top_k: u32,
    ) -> Result<Self, CoreError> {
        let top_k = validate_top_k(top_k)?;
        let messages = store.read(&document);
        info!(document = %document.as_str(), restored = messages.len(), "opened chat session");
        Ok(Self {
            store,
            clock,
            document,
            top_k,
            messages,
            generation: 0,
        })
    }

    pub fn document(&self) -> &DocumentKey {
        &self.document
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn top_k(&self) -> u32 {
        self.top_k
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Welcome message shown when the session opens. Never persisted.
    pub fn greeting(&self) -> Message {
        Message::assistant(
            format!(
                "Hello! I'm your AI assistant. I'm ready to help you explore and understand \"{}\". \
                 What would you like to know about this document?",
                self.document.display_name()
            ),
            Vec::new(),
            self.clock.now(),
        )
    }

    pub fn set_top_k(&mut self, top_k: u32) -> Result<(), CoreError> {
        self.top_k = validate_top_k(top_k)?;
        debug!(top_k, "changed top_k");
        Ok(())
    }

    /// Move to another document. Answers still in flight for the previous
    /// one will be dropped.
    pub fn switch_document(&mut self, document: DocumentKey) {
        self.generation += 1;
        self.messages = self.store.read(&document);
        info!(
            document = %document.as_str(),
            restored = self.messages.len(),
            "switched document"
        );
        self.document = document;
    }

    /// Empty the transcript and delete its saved history.
    pub fn clear(&mut self) -> bool {
        self.generation += 1;
        self.messages.clear();
        let deleted = self.store.delete(&self.document);
        info!(document = %self.document.as_str(), deleted, "cleared chat");
        deleted
    }

    /// Record a question and build its request.
    ///
    /// A blank question is rejected before anything is recorded.
    pub fn prepare(&mut self, question: &str) -> Result<PendingQuery, CoreError> {
        let request = QueryRequest::new(question, self.top_k, &self.document)?;
        let message = Message::user(request.question.clone(), self.clock.now());
        let pending = PendingQuery {
            generation: self.generation,
            question_id: message.id.clone(),
            request,
        };
        self.messages.push(message);
        self.persist();
        Ok(pending)
    }

    /// Record the result of a prepared query.
    ///
    /// The reply goes directly after its own question, so concurrent
    /// queries still read as question/answer pairs.
    pub fn finish(
        &mut self,
        pending: PendingQuery,
        result: Result<QueryAnswer, ClientError>,
    ) -> SendOutcome {
        if pending.generation != self.generation {
            warn!(
                generation = pending.generation,
                current = self.generation,
                "dropping answer for a previous session state"
            );
            return SendOutcome::Stale;
        }

        let now = self.clock.now();
        let (message, notice) = match result {
            Ok(answer) => (Message::assistant(answer.answer, answer.sources, now), None),
            Err(e) => {
                let notice = e.classify();
                warn!(error = %e, title = notice.title, "query failed");
                let content = format!("{ERROR_PREFIX}{}", notice.message);
                (Message::assistant(content, Vec::new(), now), Some(notice))
            }
        };

        let at = self
            .messages
            .iter()
            .position(|m| m.id == pending.question_id)
            .map_or(self.messages.len(), |i| i + 1);
        self.messages.insert(at, message.clone());
        self.persist();

        match notice {
            Some(notice) => SendOutcome::Failed { notice, message },
            None => SendOutcome::Answered(message),
        }
    }

    /// Prepare, ask and finish in one go.
    pub async fn send(
        &mut self,
        api: &dyn QueryService,
        question: &str,
        cancel: &CancellationToken,
    ) -> Result<SendOutcome, CoreError> {
        let pending = self.prepare(question)?;
        let result = api.ask(pending.request(), cancel).await;
        Ok(self.finish(pending, result))
    }

    /// Render the current transcript.
    pub fn export(&self, format: ExportFormat) -> Result<ExportArtifact, ExportError> {
        export(format, &self.document, &self.messages, self.clock.now())
    }

    fn persist(&self) {
        // An empty transcript is never written; clearing deletes instead.
        if self.messages.is_empty() {
            return;
        }
        match self.store.write(&self.document, self.messages.clone()) {
            WriteOutcome::Saved => {}
            WriteOutcome::SavedAfterEviction { evicted } => {
                info!(evicted = %evicted.as_str(), "history saved after evicting oldest record");
            }
            WriteOutcome::Dropped { reason } => {
                warn!(document = %self.document.as_str(), %reason, "chat history not saved");
            }
        }
    }
}
