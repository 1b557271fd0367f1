//! Vector index trait for storing and searching segment embeddings.

use async_trait::async_trait;

use crate::document::{RetrievalResult, Segment};
use crate::error::Result;

/// Which documents a search may return segments from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SearchScope {
    /// Every document in the index.
    #[default]
    All,
    /// Only the listed documents.
    Documents(Vec<String>),
}

impl SearchScope {
    /// A scope covering exactly one document.
    pub fn document(id: impl Into<String>) -> Self {
        SearchScope::Documents(vec![id.into()])
    }

    /// Whether `document_id` falls inside this scope.
    pub fn contains(&self, document_id: &str) -> bool {
        match self {
            SearchScope::All => true,
            SearchScope::Documents(ids) => ids.iter().any(|id| id == document_id),
        }
    }
}

/// A storage backend for segment vectors with similarity search.
///
/// Segments are grouped by document. Implementations must make
/// [`upsert`](VectorIndex::upsert) all-or-nothing per document: a reader sees
/// either the previous segment set or the new one, never a mix.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, SearchScope, VectorIndex};
///
/// let index = InMemoryVectorIndex::new(384, MmrParams::default())?;
/// index.upsert("report", segments).await?;
/// let results = index.search(&SearchScope::All, &query_vector, 5, true).await?;
/// ```
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// The dimensionality every stored and query vector must have.
    fn dimensions(&self) -> usize;

    /// Replace the segments of `document_id` with `segments`.
    ///
    /// Fails with [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch)
    /// without touching the index if any vector has the wrong length.
    async fn upsert(&self, document_id: &str, segments: Vec<Segment>) -> Result<()>;

    /// Remove a document and all its segments. Returns whether it was present.
    async fn remove(&self, document_id: &str) -> Result<bool>;

    /// Return up to `top_k` segments in `scope` most similar to `query`.
    ///
    /// With `diversify`, candidates are re-ranked by maximal marginal
    /// relevance. Searching an empty index yields an empty result.
    async fn search(
        &self,
        scope: &SearchScope,
        query: &[f32],
        top_k: usize,
        diversify: bool,
    ) -> Result<RetrievalResult>;

    /// Number of segments stored in `scope`.
    async fn segment_count(&self, scope: &SearchScope) -> Result<usize>;
}
