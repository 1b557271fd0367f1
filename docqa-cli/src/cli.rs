//! CLI command definitions using clap

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use docqa_rag::{RagConfig, Result};
use docqa_telemetry::TelemetryConfig;

/// DocQA - ask questions about your documents
#[derive(Parser, Debug)]
#[command(name = "docqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Logging options implied by the global flags.
    pub fn telemetry_config(&self) -> TelemetryConfig {
        let config = TelemetryConfig::default().with_json(self.json_logs);
        if self.verbose { config.with_directive("info,docqa_rag=debug,docqa_model=debug") } else { config }
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load a document and chat about it interactively
    Chat {
        /// PDF, or text file with pages separated by form feeds, to ingest
        #[arg(short, long, required_unless_present = "snapshot")]
        file: Option<PathBuf>,

        /// Index snapshot: loaded when no file is given, written after ingesting one
        #[arg(long)]
        snapshot: Option<PathBuf>,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// Answer a single question about a document
    Ask {
        /// PDF, or text file with pages separated by form feeds, to ingest
        #[arg(short, long, required_unless_present = "snapshot")]
        file: Option<PathBuf>,

        /// Index snapshot: loaded when no file is given, written after ingesting one
        #[arg(long)]
        snapshot: Option<PathBuf>,

        /// The question
        #[arg(short, long)]
        question: String,

        #[command(flatten)]
        retrieval: RetrievalArgs,
    },

    /// Summarize a research paper from its title and abstract
    SummarizePaper {
        /// Paper title
        #[arg(long)]
        title: String,

        /// Paper abstract
        #[arg(long = "abstract")]
        abstract_text: String,
    },

    /// Summarize an article in five bullet points
    SummarizeArticle {
        /// File holding the article text
        #[arg(short, long)]
        file: PathBuf,
    },
}

/// Chunking and retrieval tuning shared by `chat` and `ask`.
#[derive(Args, Debug, Clone, PartialEq)]
pub struct RetrievalArgs {
    /// Maximum characters per chunk
    #[arg(long, default_value_t = 500)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, default_value_t = 50)]
    pub chunk_overlap: usize,

    /// Segments retrieved per question
    #[arg(short = 'k', long, default_value_t = 5)]
    pub top_k: usize,

    /// Relevance/diversity trade-off in [0, 1]
    #[arg(long, default_value_t = 0.5)]
    pub mmr_lambda: f32,

    /// Candidates considered before diversity re-ranking
    #[arg(long, default_value_t = 20)]
    pub fetch_k: usize,

    /// Drop segments scoring below this similarity
    #[arg(long)]
    pub min_score: Option<f32>,

    /// Previous turns quoted back to the model
    #[arg(long, default_value_t = 0)]
    pub history: usize,

    /// Seconds to wait for an answer; 0 waits forever
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,
}

impl RetrievalArgs {
    /// Build a validated [`RagConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`docqa_rag::RagError::Configuration`] for inconsistent values.
    pub fn to_config(&self) -> Result<RagConfig> {
        let mut builder = RagConfig::builder()
            .chunk_size(self.chunk_size)
            .chunk_overlap(self.chunk_overlap)
            .top_k(self.top_k)
            .mmr_lambda(self.mmr_lambda)
            .fetch_k(self.fetch_k)
            .history_window(self.history)
            .generation_timeout((self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs)));
        if let Some(threshold) = self.min_score {
            builder = builder.similarity_threshold(threshold);
        }
        builder.build()
    }
}
