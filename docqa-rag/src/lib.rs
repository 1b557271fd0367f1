//! # docqa-rag
//!
//! Retrieval-augmented question answering over documents.
//!
//! ## Overview
//!
//! Ingestion turns a document into searchable segments; each question is
//! answered from the segments most relevant to it.
//!
//! | Stage | Type |
//! |-------|------|
//! | Page extraction | [`PdfDocumentSource`], [`TextDocumentSource`] (any [`DocumentSource`]) |
//! | Chunking | [`FixedSizeChunker`] (any [`Chunker`]) |
//! | Embedding | [`HashingEmbeddingProvider`], `OpenAIEmbeddingProvider` (feature `openai`) |
//! | Storage and search | [`InMemoryVectorIndex`] (any [`VectorIndex`]) |
//! | Retrieval | [`Retriever`], diversified with maximal marginal relevance |
//! | Answering | [`AnswerComposer`] over any [`docqa_model::TextGenerator`] |
//! | Orchestration | [`ConversationSession`] |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docqa_model::MockGenerator;
//! use docqa_rag::{
//!     ConversationSession, HashingEmbeddingProvider, InMemoryVectorIndex, InlineSource, RagConfig,
//! };
//!
//! let config = RagConfig::default();
//! let embedder = Arc::new(HashingEmbeddingProvider::default());
//! let index = Arc::new(InMemoryVectorIndex::new(384, config.mmr_params())?);
//! let generator = Arc::new(MockGenerator::new("mock"));
//!
//! let mut session = ConversationSession::new(config, embedder, index, generator)?;
//! session.load_document(&InlineSource::from_text("notes", "The sky is blue.")).await?;
//! let outcome = session.submit_query("What color is the sky?").await?;
//! ```

pub mod chunking;
pub mod composer;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod inmemory;
pub mod mmr;
#[cfg(feature = "openai")]
pub mod openai;
pub mod pdf;
pub mod retriever;
pub mod session;
pub mod source;

pub use chunking::{Chunker, FixedSizeChunker, segment_pages, split};
pub use composer::{AnswerComposer, INSUFFICIENT_CONTEXT_ANSWER, sources_line};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Document, Page, Query, RetrievalResult, Role, ScoredSegment, Segment, Turn};
pub use embedding::{EmbeddingProvider, HashingEmbeddingProvider};
pub use error::{RagError, Result};
pub use index::{SearchScope, VectorIndex};
pub use inmemory::InMemoryVectorIndex;
pub use mmr::{MmrCandidate, MmrParams, cosine_similarity, maximal_marginal_relevance};
#[cfg(feature = "openai")]
pub use openai::OpenAIEmbeddingProvider;
pub use pdf::PdfDocumentSource;
pub use retriever::{DEFAULT_TOP_K, Retriever};
pub use session::{ConversationSession, IngestReport, QueryOutcome, RejectReason, SessionState};
pub use source::{DocumentSource, InlineSource, PAGE_BREAK, TextDocumentSource};
