//! Process-wide components, built once at startup and shared by reference.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use docqa_model::{GeneratorBackend, TextGenerator};
use docqa_rag::{
    ConversationSession, Document, DocumentSource, EmbeddingProvider, HashingEmbeddingProvider,
    InMemoryVectorIndex, OpenAIEmbeddingProvider, PdfDocumentSource, RagConfig, TextDocumentSource,
    VectorIndex,
};
use tracing::info;

/// Pick the embedder: an OpenAI-compatible service when `EMBEDDING_API_KEY`
/// is set, the local hashing embedder otherwise.
pub fn embedder_from_lookup<F>(lookup: F) -> anyhow::Result<Arc<dyn EmbeddingProvider>>
where
    F: Fn(&str) -> Option<String>,
{
    match OpenAIEmbeddingProvider::from_lookup(lookup)? {
        Some(provider) => {
            info!(provider = "OpenAI", model = provider.model(), "selected embedder");
            Ok(Arc::new(provider))
        }
        None => {
            info!(provider = "hashing", "selected embedder");
            Ok(Arc::new(HashingEmbeddingProvider::default()))
        }
    }
}

/// Pick the generation backend from the environment.
pub fn generator_from_env() -> anyhow::Result<Arc<dyn TextGenerator>> {
    let backend = GeneratorBackend::from_env().context("failed to configure generation backend")?;
    Ok(Arc::new(backend))
}

/// The page source for `path`: PDF extraction for `.pdf` files, form-feed
/// separated text otherwise.
pub fn source_for(path: &Path) -> Box<dyn DocumentSource> {
    let is_pdf = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf { Box::new(PdfDocumentSource::new(path)) } else { Box::new(TextDocumentSource::new(path)) }
}

/// An index sized for `embedder`, restored from `snapshot` when one is given
/// and no document is about to replace it. Restored indexes come with the
/// documents they hold.
pub async fn open_index(
    embedder: &dyn EmbeddingProvider,
    config: &RagConfig,
    snapshot: Option<&Path>,
    fresh: bool,
) -> anyhow::Result<(Arc<InMemoryVectorIndex>, Vec<Document>)> {
    match snapshot {
        Some(path) if !fresh => {
            let (index, documents) = InMemoryVectorIndex::load_snapshot(path, config.mmr_params()).await?;
            Ok((Arc::new(index), documents))
        }
        _ => Ok((Arc::new(InMemoryVectorIndex::new(embedder.dimensions(), config.mmr_params())?), Vec::new())),
    }
}

/// Build a ready session: ingest `file`, or attach every document in the
/// snapshot index. A freshly ingested index is written back to `snapshot`.
pub async fn ready_session(
    config: RagConfig,
    file: Option<&Path>,
    snapshot: Option<&Path>,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Arc<dyn TextGenerator>,
) -> anyhow::Result<ConversationSession> {
    let (index, restored) = open_index(embedder.as_ref(), &config, snapshot, file.is_some()).await?;
    let shared: Arc<dyn VectorIndex> = index.clone();
    let mut session = ConversationSession::new(config, embedder, shared, generator)?;

    match file {
        Some(path) => {
            let report = session
                .load_document(source_for(path).as_ref())
                .await
                .with_context(|| format!("failed to ingest '{}'", path.display()))?;
            eprintln!(
                "Loaded {} ({} pages, {} skipped, {} segments)",
                report.document.display_name, report.pages_read, report.pages_skipped, report.segment_count
            );
            if let Some(path) = snapshot {
                index.save_snapshot(path, session.documents()).await?;
            }
        }
        None => {
            for document in restored {
                session.attach_indexed(document).await?;
            }
            eprintln!("Restored {} document(s) from snapshot", session.documents().len());
        }
    }
    Ok(session)
}
