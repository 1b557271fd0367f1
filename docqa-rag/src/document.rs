//! Data types for documents, segments, retrieval results and conversation turns.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A source document. Owns the segments created from it during ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Document {
    /// Unique identifier; the index is keyed by it.
    pub id: String,
    /// Human-readable name, e.g. the uploaded file name.
    pub display_name: String,
}

impl Document {
    /// Create a document descriptor.
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self { id: id.into(), display_name: display_name.into() }
    }
}

/// Text extracted from one page of a document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Page {
    /// 1-based page number, when the source has pages.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u32>,
    /// The extracted text.
    pub text: String,
}

impl Page {
    /// A numbered page.
    pub fn numbered(number: u32, text: impl Into<String>) -> Self {
        Self { number: Some(number), text: text.into() }
    }

    /// Text without page information.
    pub fn unnumbered(text: impl Into<String>) -> Self {
        Self { number: None, text: text.into() }
    }
}

/// The unit of retrieval: a bounded slice of a document with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Unique identifier, `{document_id}_{index}`.
    pub id: String,
    /// The ID of the owning [`Document`].
    pub document_id: String,
    /// Page the text came from, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
    /// The segment text.
    pub text: String,
    /// The embedding of `text`.
    pub vector: Vec<f32>,
}

/// A retrieved [`Segment`] paired with its relevance score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredSegment {
    /// The retrieved segment.
    pub segment: Segment,
    /// Cosine similarity to the query, in `[-1, 1]`.
    pub score: f32,
}

/// Ranked segments returned for one query, most relevant first.
///
/// Never holds two entries with the same segment ID.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    results: Vec<ScoredSegment>,
}

impl RetrievalResult {
    /// Wrap ranked results, dropping any repeated segment ID after its first occurrence.
    pub fn new(results: Vec<ScoredSegment>) -> Self {
        let mut seen = HashSet::new();
        let results = results.into_iter().filter(|r| seen.insert(r.segment.id.clone())).collect();
        Self { results }
    }

    /// An empty result ("insufficient context").
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether nothing was retrieved.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of retrieved segments.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Iterate in ranking order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredSegment> {
        self.results.iter()
    }

    /// The highest-ranked entry.
    pub fn top(&self) -> Option<&ScoredSegment> {
        self.results.first()
    }

    /// Segment IDs in ranking order.
    pub fn segment_ids(&self) -> Vec<String> {
        self.results.iter().map(|r| r.segment.id.clone()).collect()
    }

    /// Keep only entries scoring at least `threshold`.
    pub(crate) fn retain_above(&mut self, threshold: f32) {
        self.results.retain(|r| r.score >= threshold);
    }

    /// Consume into the ranked entries.
    pub fn into_vec(self) -> Vec<ScoredSegment> {
        self.results
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a ScoredSegment;
    type IntoIter = std::slice::Iter<'a, ScoredSegment>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

/// A question as submitted. Lives only as long as the turn it produces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// The question text, verbatim.
    pub text: String,
    /// When it was submitted.
    pub timestamp: DateTime<Utc>,
}

impl Query {
    /// Stamp `text` with the current time.
    pub fn now(text: impl Into<String>) -> Self {
        Self { text: text.into(), timestamp: Utc::now() }
    }
}

/// Who produced a [`Turn`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The person asking.
    User,
    /// The answering model.
    Assistant,
}

/// One entry of the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turn {
    /// Who produced it.
    pub role: Role,
    /// The question, answer or error text shown to the user.
    pub content: String,
    /// Segments the answer was grounded on.
    pub source_segment_ids: Vec<String>,
    /// Set on assistant turns standing in for a failed answer.
    pub failed: bool,
    /// When it was appended.
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// A user turn for `query`.
    pub fn user(query: &Query) -> Self {
        Self {
            role: Role::User,
            content: query.text.clone(),
            source_segment_ids: Vec::new(),
            failed: false,
            timestamp: query.timestamp,
        }
    }

    /// A successful assistant answer.
    pub fn assistant(content: impl Into<String>, source_segment_ids: Vec<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            source_segment_ids,
            failed: false,
            timestamp: Utc::now(),
        }
    }

    /// A visible stand-in for an answer that could not be produced.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: message.into(),
            source_segment_ids: Vec::new(),
            failed: true,
            timestamp: Utc::now(),
        }
    }
}
