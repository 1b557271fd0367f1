//! Conversation sessions: ingestion and question answering over one scope.
//!
//! A [`ConversationSession`] owns its conversation history and the set of
//! documents it may answer from. Ingestion runs chunk → embed → upsert for one
//! document at a time; each question runs retrieve → compose and appends a
//! user turn followed by an assistant turn.

use std::sync::Arc;

use docqa_model::TextGenerator;
use tracing::{debug, error, info, warn};

use crate::chunking::{FixedSizeChunker, segment_pages};
use crate::composer::AnswerComposer;
use crate::config::RagConfig;
use crate::document::{Document, Page, Query, Role, Turn};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{SearchScope, VectorIndex};
use crate::retriever::Retriever;
use crate::source::DocumentSource;

/// Whether a session can answer questions yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No document ingested.
    Empty,
    /// At least one document ingested.
    Ready,
}

/// Why a submission was ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// The text was empty or whitespace.
    Empty,
    /// The text repeats the immediately preceding submission.
    Duplicate,
    /// No document has been ingested.
    NotReady,
}

/// Result of [`ConversationSession::submit_query`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    /// The question was answered; the assistant turn is also in the history.
    Answered(Turn),
    /// Nothing was appended.
    Rejected(RejectReason),
}

/// Summary of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    /// The ingested document.
    pub document: Document,
    /// Number of pages that yielded text.
    pub pages_read: usize,
    /// Number of pages skipped as unreadable.
    pub pages_skipped: usize,
    /// Number of segments stored in the index.
    pub segment_count: usize,
}

/// A single conversation over one or more ingested documents.
///
/// Methods that change the conversation take `&mut self`, so at most one
/// ingestion or question is in flight per session. Dropping an unfinished
/// [`submit_query`](Self::submit_query) future discards its answer.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{ConversationSession, InlineSource, RagConfig};
///
/// let mut session = ConversationSession::new(RagConfig::default(), embedder, index, generator)?;
/// session.load_document(&InlineSource::from_text("notes", "The sky is blue.")).await?;
/// let outcome = session.submit_query("What color is the sky?").await?;
/// ```
pub struct ConversationSession {
    config: RagConfig,
    chunker: FixedSizeChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    retriever: Retriever,
    composer: AnswerComposer,
    documents: Vec<Document>,
    history: Vec<Turn>,
    last_query: Option<String>,
}

impl ConversationSession {
    /// Create an empty session.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `config` is invalid or the
    /// embedder and index disagree on dimensionality.
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        index: Arc<dyn VectorIndex>,
        generator: Arc<dyn TextGenerator>,
    ) -> Result<Self> {
        config.validate()?;
        if embedder.dimensions() != index.dimensions() {
            return Err(RagError::Configuration(format!(
                "embedder produces {} dimensions but the index expects {}",
                embedder.dimensions(),
                index.dimensions()
            )));
        }

        let chunker = FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?;
        let retriever = Retriever::new(embedder.clone(), index.clone())
            .with_similarity_threshold(config.similarity_threshold);
        let composer = AnswerComposer::new(generator)
            .with_generation(config.generation)
            .with_timeout(config.generation_timeout)
            .with_history_window(config.history_window);

        Ok(Self {
            config,
            chunker,
            embedder,
            index,
            retriever,
            composer,
            documents: Vec::new(),
            history: Vec::new(),
            last_query: None,
        })
    }

    /// The session configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        if self.documents.is_empty() { SessionState::Empty } else { SessionState::Ready }
    }

    /// Documents this session answers from.
    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    /// The conversation so far, oldest first.
    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    /// The composer used for answers.
    pub fn composer(&self) -> &AnswerComposer {
        &self.composer
    }

    /// The search scope covering this session's documents.
    pub fn scope(&self) -> SearchScope {
        SearchScope::Documents(self.documents.iter().map(|d| d.id.clone()).collect())
    }

    /// Replace the session's documents with the one from `source`.
    ///
    /// On success, previously loaded documents are removed from the index and
    /// the history is cleared. On failure the session and index are unchanged.
    ///
    /// # Errors
    ///
    /// See [`add_document`](Self::add_document).
    pub async fn load_document(&mut self, source: &dyn DocumentSource) -> Result<IngestReport> {
        let report = self.ingest(source).await?;

        let previous = std::mem::replace(&mut self.documents, vec![report.document.clone()]);
        for stale in previous.iter().filter(|d| d.id != report.document.id) {
            // Stale segments are already outside the new scope.
            if let Err(e) = self.index.remove(&stale.id).await {
                warn!(document.id = %stale.id, error = %e, "failed to remove replaced document");
            }
        }
        self.history.clear();
        self.last_query = None;
        Ok(report)
    }

    /// Ingest the document from `source` alongside those already loaded.
    ///
    /// Re-adding a document ID replaces its segments. The history is kept.
    ///
    /// # Errors
    ///
    /// - [`RagError::Document`] if no page is readable.
    /// - [`RagError::Embedding`] if the embedder fails or returns the wrong number of vectors.
    /// - [`RagError::DimensionMismatch`] or [`RagError::IndexUnavailable`] from the index.
    pub async fn add_document(&mut self, source: &dyn DocumentSource) -> Result<IngestReport> {
        let report = self.ingest(source).await?;
        self.documents.retain(|d| d.id != report.document.id);
        self.documents.push(report.document.clone());
        Ok(report)
    }

    /// Answer from a document the index already holds, e.g. after loading a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Document`] if the index has no segments for it.
    pub async fn attach_indexed(&mut self, document: Document) -> Result<usize> {
        let count = self.index.segment_count(&SearchScope::document(document.id.clone())).await?;
        if count == 0 {
            return Err(RagError::Document(format!("document '{}' is not indexed", document.id)));
        }
        self.documents.retain(|d| d.id != document.id);
        self.documents.push(document);
        Ok(count)
    }

    /// Clear the history and the duplicate-submission guard. Documents stay loaded.
    pub fn reset(&mut self) {
        self.history.clear();
        self.last_query = None;
    }

    /// Ask a question.
    ///
    /// Empty text, a verbatim repeat of the previous submission, or a session
    /// without documents is rejected without touching the history. Otherwise a
    /// user turn is appended, followed by the assistant's answer.
    ///
    /// # Errors
    ///
    /// If retrieval or generation fails, the user turn stays in the history,
    /// an error-marked assistant turn is appended, and the error is returned.
    /// The duplicate guard is only set once an answer is recorded, so a failed
    /// or cancelled question can be retried. If the previous call was dropped
    /// before it finished, its unanswered user turn is discarded first.
    pub async fn submit_query(&mut self, text: &str) -> Result<QueryOutcome> {
        if text.trim().is_empty() {
            return Ok(QueryOutcome::Rejected(RejectReason::Empty));
        }
        if self.state() == SessionState::Empty {
            return Ok(QueryOutcome::Rejected(RejectReason::NotReady));
        }
        if self.last_query.as_deref() == Some(text) {
            return Ok(QueryOutcome::Rejected(RejectReason::Duplicate));
        }

        if self.history.last().is_some_and(|turn| turn.role == Role::User) {
            debug!("discarding unanswered turn from a cancelled query");
            self.history.pop();
        }

        let query = Query::now(text);
        self.history.push(Turn::user(&query));

        match self.answer(&query).await {
            Ok(turn) => {
                info!(
                    result_count = turn.source_segment_ids.len(),
                    history_len = self.history.len() + 1,
                    "answered question"
                );
                self.history.push(turn.clone());
                self.last_query = Some(query.text);
                Ok(QueryOutcome::Answered(turn))
            }
            Err(e) => {
                error!(error = %e, "failed to answer question");
                self.history.push(Turn::failure(format!("Error: {e}")));
                self.last_query = None;
                Err(e)
            }
        }
    }

    async fn answer(&self, query: &Query) -> Result<Turn> {
        let retrieval = self.retriever.retrieve(&self.scope(), &query.text, self.config.top_k).await?;
        // Everything before the user turn just appended.
        let prior = &self.history[..self.history.len().saturating_sub(1)];
        self.composer.compose_cited(&query.text, &retrieval, prior, &self.documents).await
    }

    async fn ingest(&self, source: &dyn DocumentSource) -> Result<IngestReport> {
        let document = source.document().clone();

        let mut pages: Vec<Page> = Vec::new();
        let mut pages_skipped = 0;
        for page in source.pages().await {
            match page {
                Ok(page) => pages.push(page),
                Err(e) => {
                    warn!(document.id = %document.id, error = %e, "skipping unreadable page");
                    pages_skipped += 1;
                }
            }
        }

        let mut segments = segment_pages(&self.chunker, &document, &pages);
        if segments.is_empty() {
            error!(document.id = %document.id, pages_skipped, "document has no readable text");
            return Err(RagError::Document(format!(
                "document '{}' has no readable text",
                document.id
            )));
        }

        let texts: Vec<&str> = segments.iter().map(|s| s.text.as_str()).collect();
        let vectors = self.embedder.embed_batch(&texts).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "embedding failed during ingestion");
        })?;
        if vectors.len() != segments.len() {
            error!(
                document.id = %document.id,
                expected = segments.len(),
                actual = vectors.len(),
                "embedder returned the wrong number of vectors"
            );
            return Err(RagError::Embedding {
                provider: "embed_batch".to_string(),
                message: format!(
                    "expected {} vectors for document '{}', got {}",
                    segments.len(),
                    document.id,
                    vectors.len()
                ),
            });
        }
        for (segment, vector) in segments.iter_mut().zip(vectors) {
            segment.vector = vector;
        }

        let segment_count = segments.len();
        self.index.upsert(&document.id, segments).await.inspect_err(|e| {
            error!(document.id = %document.id, error = %e, "upsert failed during ingestion");
        })?;

        info!(
            document.id = %document.id,
            pages_read = pages.len(),
            pages_skipped,
            segment_count,
            "ingested document"
        );
        Ok(IngestReport { document, pages_read: pages.len(), pages_skipped, segment_count })
    }
}

impl std::fmt::Debug for ConversationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationSession")
            .field("state", &self.state())
            .field("documents", &self.documents)
            .field("history_len", &self.history.len())
            .field("composer", &self.composer)
            .finish_non_exhaustive()
    }
}
