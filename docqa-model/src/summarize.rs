//! One-shot summarization prompts for research papers and web articles.

use std::sync::Arc;

use tracing::info;

use crate::error::{ModelError, Result};
use crate::generation::{GenerationConfig, TextGenerator};

/// Summarizes a research paper from its title and abstract.
pub struct PaperSummarizer {
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
}

impl PaperSummarizer {
    /// Create a summarizer with a slightly warmer sampling temperature than Q&A.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator, config: GenerationConfig::default().with_temperature(0.3) }
    }

    /// Override the sampling parameters.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// The prompt sent for a given paper.
    pub fn build_prompt(title: &str, abstract_text: &str) -> String {
        format!(
            "You are an expert research assistant. Given the following title and abstract, \
             produce a concise summary (3-5 sentences) highlighting the main contributions, \
             methodology, and significance.\n\n\
             Title: {title}\n\nAbstract: {abstract_text}\n\nSummary:"
        )
    }

    /// Produce a 3-5 sentence summary.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if both title and abstract are blank, or
    /// whatever the generator fails with.
    pub async fn summarize(&self, title: &str, abstract_text: &str) -> Result<String> {
        if title.trim().is_empty() && abstract_text.trim().is_empty() {
            return Err(ModelError::Config("paper has neither title nor abstract".into()));
        }
        let prompt = Self::build_prompt(title.trim(), abstract_text.trim());
        let summary = self.generator.generate(&prompt, &self.config).await?;
        info!(model = self.generator.name(), summary_len = summary.len(), "summarized paper");
        Ok(summary.trim().to_string())
    }
}

/// Summarizes article text as five bullet points.
pub struct ArticleSummarizer {
    generator: Arc<dyn TextGenerator>,
    config: GenerationConfig,
}

impl ArticleSummarizer {
    /// Create a summarizer with default sampling parameters.
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator, config: GenerationConfig::default() }
    }

    /// Override the sampling parameters.
    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = config;
        self
    }

    /// The prompt sent for a given article body.
    pub fn build_prompt(text: &str) -> String {
        format!("Summarize the following article in 5 bullet points:\n\n{text}\n")
    }

    /// Summarize `text`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] for blank input, or whatever the
    /// generator fails with.
    pub async fn summarize(&self, text: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Err(ModelError::Config("article text is empty".into()));
        }
        let summary = self.generator.generate(&Self::build_prompt(text), &self.config).await?;
        info!(model = self.generator.name(), article_len = text.len(), "summarized article");
        Ok(summary.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockGenerator, MockReply};

    #[tokio::test]
    async fn paper_prompt_carries_title_and_abstract() {
        let mock = Arc::new(
            MockGenerator::new("mock").with_reply(MockReply::Text("  A short summary. \n".into())),
        );
        let summarizer = PaperSummarizer::new(mock.clone());

        let summary = summarizer
            .summarize("Attention Is All You Need", "We propose the Transformer.")
            .await
            .unwrap();

        assert_eq!(summary, "A short summary.");
        let prompts = mock.prompts().await;
        assert!(prompts[0].contains("Title: Attention Is All You Need"));
        assert!(prompts[0].contains("Abstract: We propose the Transformer."));
        assert!(prompts[0].ends_with("Summary:"));
    }

    #[tokio::test]
    async fn blank_article_never_reaches_the_model() {
        let mock = Arc::new(MockGenerator::new("mock"));
        let summarizer = ArticleSummarizer::new(mock.clone());

        assert!(matches!(summarizer.summarize(" \n ").await, Err(ModelError::Config(_))));
        assert_eq!(mock.call_count().await, 0);
    }

    #[tokio::test]
    async fn article_prompt_asks_for_bullets() {
        let mock = Arc::new(MockGenerator::new("mock"));
        let summarizer = ArticleSummarizer::new(mock.clone());

        summarizer.summarize("Rust 2024 edition ships.").await.unwrap();

        let prompts = mock.prompts().await;
        assert!(prompts[0].starts_with("Summarize the following article in 5 bullet points"));
        assert!(prompts[0].contains("Rust 2024 edition ships."));
    }
}
