//! Grounded answer composition with source attribution.
//!
//! [`AnswerComposer`] turns a question plus its [`RetrievalResult`] into a
//! single generation prompt, calls the configured [`TextGenerator`] once, and
//! appends a `Sources:` line naming the pages the answer was grounded on.

use std::collections::{HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use docqa_model::{GenerationConfig, ModelError, TextGenerator};
use tracing::{debug, error};

use crate::document::{Document, RetrievalResult, Role, Turn};
use crate::error::{RagError, Result};

/// Answer returned without calling the model when nothing was retrieved.
pub const INSUFFICIENT_CONTEXT_ANSWER: &str = "I don't have enough information to answer this question.";

const INSTRUCTIONS: &str = "\
You are an expert assistant that answers questions using only the provided context.

Instructions:
1. Answer the question from the context below and nothing else.
2. If the context does not contain the answer, say \"I don't have enough information to answer this question.\"
3. Be concise but thorough.
4. When relevant, cite the source document name and page number.
5. Write in clear, easy-to-read paragraphs.
6. Use bullet points or numbered lists when they help.";

/// Builds grounded prompts and turns model output into assistant [`Turn`]s.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::AnswerComposer;
///
/// let composer = AnswerComposer::new(generator).with_timeout(Some(Duration::from_secs(30)));
/// let turn = composer.compose("What color is the sky?", &retrieved, &history).await?;
/// ```
#[derive(Clone)]
pub struct AnswerComposer {
    generator: Arc<dyn TextGenerator>,
    generation: GenerationConfig,
    timeout: Option<Duration>,
    history_window: usize,
}

impl AnswerComposer {
    /// Create a composer with default sampling, no timeout and no history.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            generator,
            generation: GenerationConfig::default(),
            timeout: None,
            history_window: 0,
        }
    }

    /// Set the sampling parameters.
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    /// Bound each generation call.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Quote up to `turns` most recent successful turns in the prompt.
    pub fn with_history_window(mut self, turns: usize) -> Self {
        self.history_window = turns;
        self
    }

    /// Build the prompt sent to the model.
    ///
    /// Segments appear in ranking order separated by blank lines; the question
    /// is included verbatim.
    pub fn build_prompt(&self, question: &str, retrieval: &RetrievalResult, history: &[Turn]) -> String {
        let mut prompt = String::with_capacity(INSTRUCTIONS.len() + question.len() + 256);
        prompt.push_str(INSTRUCTIONS);
        prompt.push_str("\n\nContext:\n");
        let context: Vec<&str> = retrieval.iter().map(|r| r.segment.text.as_str()).collect();
        prompt.push_str(&context.join("\n\n"));

        let recent = self.recent_turns(history);
        if !recent.is_empty() {
            prompt.push_str("\n\nConversation so far:\n");
            for turn in recent {
                let speaker = match turn.role {
                    Role::User => "User",
                    Role::Assistant => "Assistant",
                };
                let _ = writeln!(prompt, "{speaker}: {}", turn.content);
            }
        } else {
            prompt.push('\n');
        }

        let _ = write!(prompt, "\nQuestion: {question}\n\nAnswer:");
        prompt
    }

    /// Answer `question` from `retrieval`, naming sources by document ID.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the model fails or times out.
    pub async fn compose(
        &self,
        question: &str,
        retrieval: &RetrievalResult,
        history: &[Turn],
    ) -> Result<Turn> {
        self.compose_cited(question, retrieval, history, &[]).await
    }

    /// Like [`compose`](Self::compose), naming sources by the display names in
    /// `documents` when the answer draws on more than one document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the model fails or times out.
    pub async fn compose_cited(
        &self,
        question: &str,
        retrieval: &RetrievalResult,
        history: &[Turn],
        documents: &[Document],
    ) -> Result<Turn> {
        if retrieval.is_empty() {
            debug!("no context retrieved, answering without generation");
            return Ok(Turn::assistant(INSUFFICIENT_CONTEXT_ANSWER, Vec::new()));
        }

        let prompt = self.build_prompt(question, retrieval, history);
        let generator = self.generator.name().to_string();
        debug!(provider = %generator, prompt_chars = prompt.len(), "calling generator");

        let call = self.generator.generate(&prompt, &self.generation);
        let response = match self.timeout {
            Some(after) => match tokio::time::timeout(after, call).await {
                Ok(response) => response,
                Err(_) => Err(ModelError::Timeout { after }),
            },
            None => call.await,
        }
        .map_err(|e| {
            error!(provider = %generator, error = %e, "answer generation failed");
            RagError::Generation(e)
        })?;

        let mut answer = response.trim().to_string();
        if let Some(sources) = sources_line(retrieval, documents) {
            answer.push_str("\n\n");
            answer.push_str(&sources);
        }
        Ok(Turn::assistant(answer, retrieval.segment_ids()))
    }

    fn recent_turns<'a>(&self, history: &'a [Turn]) -> Vec<&'a Turn> {
        if self.history_window == 0 {
            return Vec::new();
        }
        let usable: Vec<&Turn> = history.iter().filter(|t| !t.failed).collect();
        let skip = usable.len().saturating_sub(self.history_window);
        usable.into_iter().skip(skip).collect()
    }
}

impl std::fmt::Debug for AnswerComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnswerComposer")
            .field("generator", &self.generator.name())
            .field("generation", &self.generation)
            .field("timeout", &self.timeout)
            .field("history_window", &self.history_window)
            .finish()
    }
}

/// Format the `Sources:` line for `retrieval`, or `None` if no segment has a page.
///
/// Entries are deduplicated in ranking order. When segments come from several
/// documents each entry is prefixed with the document's display name, falling
/// back to its ID.
pub fn sources_line(retrieval: &RetrievalResult, documents: &[Document]) -> Option<String> {
    let names: HashMap<&str, &str> =
        documents.iter().map(|d| (d.id.as_str(), d.display_name.as_str())).collect();
    let document_count =
        retrieval.iter().map(|r| r.segment.document_id.as_str()).collect::<HashSet<_>>().len();

    let mut seen = HashSet::new();
    let mut entries = Vec::new();
    for scored in retrieval {
        let Some(page) = scored.segment.page_number else { continue };
        let document_id = scored.segment.document_id.as_str();
        let entry = if document_count > 1 {
            let name = names.get(document_id).copied().unwrap_or(document_id);
            format!("{name} (Page {page})")
        } else {
            format!("Page {page}")
        };
        if seen.insert(entry.clone()) {
            entries.push(entry);
        }
    }

    if entries.is_empty() { None } else { Some(format!("Sources: {}", entries.join(", "))) }
}
