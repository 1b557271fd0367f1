//! Query-time retrieval: embed the question, search the index, filter.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::index::{SearchScope, VectorIndex};

/// Number of segments retrieved when the caller does not say otherwise.
pub const DEFAULT_TOP_K: usize = 5;

/// Finds the segments most relevant to a question.
///
/// Searches are always diversified with maximal marginal relevance so that a
/// single answer is not grounded on several near-identical segments.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    index: Arc<dyn VectorIndex>,
    similarity_threshold: Option<f32>,
}

impl Retriever {
    /// Create a retriever over `index`, embedding questions with `embedder`.
    pub fn new(embedder: Arc<dyn EmbeddingProvider>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index, similarity_threshold: None }
    }

    /// Drop results scoring below `threshold`.
    pub fn with_similarity_threshold(mut self, threshold: Option<f32>) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    /// The index this retriever searches.
    pub fn index(&self) -> &Arc<dyn VectorIndex> {
        &self.index
    }

    /// Retrieve up to `k` segments from `scope` relevant to `question`.
    ///
    /// A scope without any ingested segment yields an empty result; callers
    /// should treat that as "insufficient context", not as a failure.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::Embedding`](crate::RagError::Embedding),
    /// [`RagError::IndexUnavailable`](crate::RagError::IndexUnavailable) and
    /// [`RagError::DimensionMismatch`](crate::RagError::DimensionMismatch).
    pub async fn retrieve(
        &self,
        scope: &SearchScope,
        question: &str,
        k: usize,
    ) -> Result<RetrievalResult> {
        let available = self.index.segment_count(scope).await.inspect_err(|e| {
            error!(error = %e, "segment count failed during retrieval");
        })?;
        if available == 0 {
            debug!(?scope, "no segments in scope");
            return Ok(RetrievalResult::empty());
        }

        let query = self.embedder.embed(question).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
        })?;

        let mut results = self.index.search(scope, &query, k, true).await.inspect_err(|e| {
            error!(error = %e, "vector index search failed");
        })?;

        if let Some(threshold) = self.similarity_threshold {
            results.retain_above(threshold);
        }

        debug!(result_count = results.len(), "retrieved segments");
        Ok(results)
    }
}

impl std::fmt::Debug for Retriever {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Retriever")
            .field("dimensions", &self.index.dimensions())
            .field("similarity_threshold", &self.similarity_threshold)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Segment;
    use crate::embedding::HashingEmbeddingProvider;
    use crate::inmemory::InMemoryVectorIndex;
    use crate::mmr::MmrParams;

    async fn retriever_with(texts: &[&str]) -> Retriever {
        let embedder = Arc::new(HashingEmbeddingProvider::new(384).unwrap());
        let index = Arc::new(InMemoryVectorIndex::new(384, MmrParams::default()).unwrap());
        let mut segments = Vec::new();
        for (i, text) in texts.iter().enumerate() {
            segments.push(Segment {
                id: format!("doc_{i}"),
                document_id: "doc".to_string(),
                page_number: Some(1),
                text: text.to_string(),
                vector: embedder.embed(text).await.unwrap(),
            });
        }
        index.upsert("doc", segments).await.unwrap();
        Retriever::new(embedder, index)
    }

    #[tokio::test]
    async fn empty_scope_returns_empty_result() {
        let retriever = retriever_with(&["alpha beta"]).await;
        let result =
            retriever.retrieve(&SearchScope::document("missing"), "alpha", DEFAULT_TOP_K).await;
        assert!(result.unwrap().is_empty());
    }

    #[tokio::test]
    async fn threshold_filters_weak_matches() {
        let retriever = retriever_with(&["rust borrow checker", "banana bread recipe"])
            .await
            .with_similarity_threshold(Some(0.5));
        let result =
            retriever.retrieve(&SearchScope::All, "borrow checker rust", DEFAULT_TOP_K).await;
        assert_eq!(result.unwrap().segment_ids(), vec!["doc_0"]);
    }
}
