//! Error types for the `docqa-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting documents or answering questions.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid chunking, index or session parameters. Not recoverable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The embedding capability rejected the input or could not be reached.
    #[error("Embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The backing store of the vector index could not be reached.
    #[error("Vector index unavailable ({backend}): {message}")]
    IndexUnavailable {
        /// The index backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A vector's dimensionality differs from the index's.
    #[error("Dimension mismatch for '{segment_id}': expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The offending segment, or `"query"` for a query vector.
        segment_id: String,
        /// The index's configured dimensionality.
        expected: usize,
        /// The dimensionality actually supplied.
        actual: usize,
    },

    /// The generation capability failed or timed out.
    #[error("Generation error: {0}")]
    Generation(#[from] docqa_model::ModelError),

    /// A document could not be read at all.
    #[error("Document error: {0}")]
    Document(String),
}

impl RagError {
    /// Whether the caller may retry the operation later.
    ///
    /// Transient upstream failures are recoverable; configuration and
    /// document errors are not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            RagError::Embedding { .. } | RagError::IndexUnavailable { .. } | RagError::Generation(_)
        )
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
