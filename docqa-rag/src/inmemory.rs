//! In-memory vector index using cosine similarity.
//!
//! This module provides [`InMemoryVectorIndex`], a vector index backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for a single
//! process and can be snapshotted to a JSON file between runs.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::document::{Document, RetrievalResult, ScoredSegment, Segment};
use crate::error::{RagError, Result};
use crate::index::{SearchScope, VectorIndex};
use crate::mmr::{MmrCandidate, MmrParams, cosine_similarity, maximal_marginal_relevance};

const BACKEND: &str = "InMemory";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredSegment {
    sequence: u64,
    segment: Segment,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IndexState {
    documents: HashMap<String, Vec<StoredSegment>>,
    next_sequence: u64,
}

#[derive(Deserialize)]
struct Snapshot {
    dimensions: usize,
    state: IndexState,
    #[serde(default)]
    documents: Vec<Document>,
}

/// An in-memory vector index using cosine similarity for search.
///
/// Segments are stored per document: document ID → segments in insertion
/// order. Every segment gets a global insertion sequence used to break
/// similarity ties deterministically. All operations are async-safe via a
/// single `tokio::sync::RwLock`, so an upsert is observed all at once.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorIndex, MmrParams, VectorIndex};
///
/// let index = InMemoryVectorIndex::new(384, MmrParams::default())?;
/// index.upsert("report", segments).await?;
/// ```
#[derive(Debug)]
pub struct InMemoryVectorIndex {
    dimensions: usize,
    mmr: MmrParams,
    state: RwLock<IndexState>,
}

impl InMemoryVectorIndex {
    /// Create a new empty index for `dimensions`-sized vectors.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `dimensions` is zero or the MMR
    /// parameters are invalid.
    pub fn new(dimensions: usize, mmr: MmrParams) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::Configuration("index dimensions must be > 0".into()));
        }
        mmr.validate()?;
        Ok(Self { dimensions, mmr, state: RwLock::new(IndexState::default()) })
    }

    /// The MMR parameters used by diversified searches.
    pub fn mmr_params(&self) -> MmrParams {
        self.mmr
    }

    /// IDs of all indexed documents, sorted.
    pub async fn document_ids(&self) -> Vec<String> {
        let state = self.state.read().await;
        let mut ids: Vec<String> = state.documents.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Write the whole index to `path` as JSON, together with the
    /// descriptions of the documents it holds.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the file cannot be written.
    pub async fn save_snapshot(&self, path: impl AsRef<Path>, documents: &[Document]) -> Result<()> {
        let path = path.as_ref();
        let bytes = {
            let state = self.state.read().await;
            let snapshot = SnapshotRef { dimensions: self.dimensions, state: &*state, documents };
            serde_json::to_vec(&snapshot).map_err(|e| unavailable(format!("encode failed: {e}")))?
        };
        tokio::fs::write(path, bytes).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to write index snapshot");
            unavailable(format!("cannot write '{}': {e}", path.display()))
        })?;
        info!(path = %path.display(), "saved index snapshot");
        Ok(())
    }

    /// Restore an index previously written by [`save_snapshot`](Self::save_snapshot).
    ///
    /// Returns the index and one [`Document`] per indexed document, in the
    /// order they were saved. Documents the snapshot holds segments for but
    /// no description are named after their ID.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexUnavailable`] if the file cannot be read or
    /// decoded, or if its contents are inconsistent: a vector of the wrong
    /// dimensionality, a segment filed under another document, or insertion
    /// sequences that repeat or reach `next_sequence`.
    pub async fn load_snapshot(path: impl AsRef<Path>, mmr: MmrParams) -> Result<(Self, Vec<Document>)> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            error!(path = %path.display(), error = %e, "failed to read index snapshot");
            unavailable(format!("cannot read '{}': {e}", path.display()))
        })?;
        let snapshot: Snapshot = serde_json::from_slice(&bytes)
            .map_err(|e| unavailable(format!("corrupt snapshot '{}': {e}", path.display())))?;

        let index = Self::new(snapshot.dimensions, mmr)?;
        check_snapshot_state(&snapshot.state, snapshot.dimensions)?;

        let mut documents: Vec<Document> = snapshot
            .documents
            .into_iter()
            .filter(|document| snapshot.state.documents.contains_key(&document.id))
            .collect();
        let mut unnamed: Vec<&String> = snapshot
            .state
            .documents
            .keys()
            .filter(|id| !documents.iter().any(|document| &document.id == *id))
            .collect();
        unnamed.sort();
        documents.extend(unnamed.into_iter().map(|id| Document::new(id.clone(), id.clone())));

        let document_count = snapshot.state.documents.len();
        *index.state.write().await = snapshot.state;
        info!(path = %path.display(), document_count, "loaded index snapshot");
        Ok((index, documents))
    }

    fn check_query(&self, query: &[f32]) -> Result<()> {
        if query.len() != self.dimensions {
            return Err(RagError::DimensionMismatch {
                segment_id: "query".to_string(),
                expected: self.dimensions,
                actual: query.len(),
            });
        }
        Ok(())
    }

    /// Validate a whole batch before anything is written.
    fn check_segments(&self, document_id: &str, segments: &[Segment]) -> Result<()> {
        let mut ids = HashSet::with_capacity(segments.len());
        for segment in segments {
            if segment.vector.len() != self.dimensions {
                return Err(RagError::DimensionMismatch {
                    segment_id: segment.id.clone(),
                    expected: self.dimensions,
                    actual: segment.vector.len(),
                });
            }
            if segment.document_id != document_id {
                return Err(RagError::Configuration(format!(
                    "segment '{}' belongs to '{}', not '{document_id}'",
                    segment.id, segment.document_id
                )));
            }
            if !ids.insert(segment.id.as_str()) {
                return Err(RagError::Configuration(format!(
                    "duplicate segment id '{}'",
                    segment.id
                )));
            }
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a> {
    dimensions: usize,
    state: &'a IndexState,
    documents: &'a [Document],
}

fn check_snapshot_state(state: &IndexState, dimensions: usize) -> Result<()> {
    let mut sequences = HashSet::new();
    for (document_id, stored_segments) in &state.documents {
        for stored in stored_segments {
            let segment = &stored.segment;
            if segment.vector.len() != dimensions {
                return Err(unavailable(format!(
                    "snapshot segment '{}' has {} dimensions, expected {dimensions}",
                    segment.id,
                    segment.vector.len()
                )));
            }
            if segment.document_id != *document_id {
                return Err(unavailable(format!(
                    "snapshot segment '{}' belongs to '{}' but is stored under '{document_id}'",
                    segment.id, segment.document_id
                )));
            }
            if stored.sequence >= state.next_sequence || !sequences.insert(stored.sequence) {
                return Err(unavailable(format!(
                    "snapshot segment '{}' has sequence {} (next sequence {})",
                    segment.id, stored.sequence, state.next_sequence
                )));
            }
        }
    }
    Ok(())
}

fn unavailable(message: String) -> RagError {
    RagError::IndexUnavailable { backend: BACKEND.to_string(), message }
}

#[async_trait]
impl VectorIndex for InMemoryVectorIndex {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn upsert(&self, document_id: &str, segments: Vec<Segment>) -> Result<()> {
        self.check_segments(document_id, &segments)?;

        let mut state = self.state.write().await;
        let first = state.next_sequence;
        let stored: Vec<StoredSegment> = segments
            .into_iter()
            .enumerate()
            .map(|(i, segment)| StoredSegment { sequence: first + i as u64, segment })
            .collect();
        state.next_sequence = first + stored.len() as u64;

        let segment_count = stored.len();
        let replaced = state.documents.insert(document_id.to_string(), stored);
        debug!(
            document.id = document_id,
            segment_count,
            replaced = replaced.is_some(),
            "upserted document"
        );
        Ok(())
    }

    async fn remove(&self, document_id: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        Ok(state.documents.remove(document_id).is_some())
    }

    async fn search(
        &self,
        scope: &SearchScope,
        query: &[f32],
        top_k: usize,
        diversify: bool,
    ) -> Result<RetrievalResult> {
        self.check_query(query)?;
        if top_k == 0 {
            return Ok(RetrievalResult::empty());
        }

        let state = self.state.read().await;
        let mut scored: Vec<(f32, &StoredSegment)> = state
            .documents
            .iter()
            .filter(|(document_id, _)| scope.contains(document_id))
            .flat_map(|(_, segments)| segments.iter())
            .map(|stored| (cosine_similarity(&stored.segment.vector, query), stored))
            .collect();

        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal).then(a.1.sequence.cmp(&b.1.sequence))
        });

        let picked: Vec<(f32, &StoredSegment)> = if diversify {
            scored.truncate(self.mmr.fetch_k.max(top_k));
            let candidates: Vec<MmrCandidate<'_>> = scored
                .iter()
                .map(|(similarity, stored)| MmrCandidate {
                    vector: &stored.segment.vector,
                    similarity: *similarity,
                    sequence: stored.sequence,
                })
                .collect();
            maximal_marginal_relevance(&candidates, self.mmr.lambda, top_k)
                .into_iter()
                .map(|i| scored[i])
                .collect()
        } else {
            scored.truncate(top_k);
            scored
        };

        Ok(RetrievalResult::new(
            picked
                .into_iter()
                .map(|(score, stored)| ScoredSegment { segment: stored.segment.clone(), score })
                .collect(),
        ))
    }

    async fn segment_count(&self, scope: &SearchScope) -> Result<usize> {
        let state = self.state.read().await;
        Ok(state
            .documents
            .iter()
            .filter(|(document_id, _)| scope.contains(document_id))
            .map(|(_, segments)| segments.len())
            .sum())
    }
}
