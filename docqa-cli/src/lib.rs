//! # docqa-cli
//!
//! The `docqa` command: interactive document Q&A plus one-shot summaries.
//!
//! | Command | Does |
//! |---------|------|
//! | `chat` | ingest a document (or restore a snapshot) and chat about it |
//! | `ask` | answer one question and exit |
//! | `summarize-paper` | 3-5 sentence summary from a title and abstract |
//! | `summarize-article` | five bullet points from an article file |
//!
//! The generation backend comes from the environment (`GROQ_API_KEY` for the
//! hosted API, otherwise a local Ollama model); a `.env` file is honoured.

pub mod cli;
pub mod repl;
pub mod setup;

use std::sync::Arc;

use anyhow::Context;
use docqa_model::{ArticleSummarizer, PaperSummarizer, TextGenerator};
use docqa_rag::{ConversationSession, QueryOutcome};

pub use cli::{Cli, Commands, RetrievalArgs};

/// Run one parsed command line to completion.
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let generator = setup::generator_from_env()?;

    match cli.command {
        Commands::Chat { file, snapshot, retrieval } => {
            let mut session = session_for(&retrieval, file, snapshot, generator).await?;
            repl::run(&mut session).await
        }
        Commands::Ask { file, snapshot, question, retrieval } => {
            let mut session = session_for(&retrieval, file, snapshot, generator).await?;
            match session.submit_query(&question).await? {
                QueryOutcome::Answered(turn) => println!("{}", turn.content),
                QueryOutcome::Rejected(reason) => anyhow::bail!("question rejected: {reason:?}"),
            }
            Ok(())
        }
        Commands::SummarizePaper { title, abstract_text } => {
            let summary = PaperSummarizer::new(generator).summarize(&title, &abstract_text).await?;
            println!("{summary}");
            Ok(())
        }
        Commands::SummarizeArticle { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("failed to read '{}'", file.display()))?;
            let summary = ArticleSummarizer::new(generator).summarize(&text).await?;
            println!("{summary}");
            Ok(())
        }
    }
}

async fn session_for(
    retrieval: &RetrievalArgs,
    file: Option<std::path::PathBuf>,
    snapshot: Option<std::path::PathBuf>,
    generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<ConversationSession> {
    let config = retrieval.to_config()?;
    let embedder = setup::embedder_from_lookup(|key| std::env::var(key).ok())?;
    setup::ready_session(config, file.as_deref(), snapshot.as_deref(), embedder, generator).await
}
