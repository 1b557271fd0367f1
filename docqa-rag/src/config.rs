//! Configuration for ingestion, retrieval and answer composition.

use std::time::Duration;

use docqa_model::GenerationConfig;
use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};
use crate::mmr::MmrParams;

/// Configuration parameters for a [`ConversationSession`](crate::ConversationSession).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of segments retrieved per question.
    pub top_k: usize,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 is pure diversity.
    pub mmr_lambda: f32,
    /// Size of the candidate pool MMR re-ranks.
    pub fetch_k: usize,
    /// Minimum similarity score for results (results below this are filtered out).
    pub similarity_threshold: Option<f32>,
    /// Number of most recent turns quoted back to the model.
    pub history_window: usize,
    /// Upper bound on a single generation call.
    pub generation_timeout: Option<Duration>,
    /// Sampling parameters for answer generation.
    pub generation: GenerationConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 50,
            top_k: 5,
            mmr_lambda: 0.5,
            fetch_k: 20,
            similarity_threshold: None,
            history_window: 0,
            generation_timeout: Some(Duration::from_secs(60)),
            generation: GenerationConfig::default(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// The MMR parameters derived from this configuration.
    pub fn mmr_params(&self) -> MmrParams {
        MmrParams { lambda: self.mmr_lambda, fetch_k: self.fetch_k }
    }

    /// Check that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0` or `fetch_k == 0`
    /// - `mmr_lambda` is outside `[0, 1]`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RagError::Configuration("chunk_size must be greater than zero".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Configuration("top_k must be greater than zero".to_string()));
        }
        if let Some(threshold) = self.similarity_threshold {
            if !threshold.is_finite() || !(-1.0..=1.0).contains(&threshold) {
                return Err(RagError::Configuration(format!(
                    "similarity_threshold ({threshold}) must be a cosine score in [-1, 1]"
                )));
            }
        }
        self.mmr_params().validate()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of segments retrieved per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the MMR relevance/diversity trade-off.
    pub fn mmr_lambda(mut self, lambda: f32) -> Self {
        self.config.mmr_lambda = lambda;
        self
    }

    /// Set the MMR candidate pool size.
    pub fn fetch_k(mut self, fetch_k: usize) -> Self {
        self.config.fetch_k = fetch_k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = Some(threshold);
        self
    }

    /// Set how many recent turns are quoted in the prompt.
    pub fn history_window(mut self, turns: usize) -> Self {
        self.config.history_window = turns;
        self
    }

    /// Set or clear the generation timeout.
    pub fn generation_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.config.generation_timeout = timeout;
        self
    }

    /// Set the sampling parameters for answer generation.
    pub fn generation(mut self, generation: GenerationConfig) -> Self {
        self.config.generation = generation;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// See [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = RagConfig::builder().build().unwrap();
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 50);
        assert_eq!(config.top_k, 5);
        assert_eq!(config.mmr_lambda, 0.5);
    }

    #[test]
    fn overlap_must_be_smaller_than_chunk() {
        let err = RagConfig::builder().chunk_size(20).chunk_overlap(20).build().unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
        assert!(!err.is_recoverable());
    }

    #[test]
    fn lambda_outside_unit_interval_is_rejected() {
        assert!(RagConfig::builder().mmr_lambda(1.5).build().is_err());
        assert!(RagConfig::builder().mmr_lambda(f32::NAN).build().is_err());
        assert!(RagConfig::builder().mmr_lambda(0.0).build().is_ok());
    }

    #[test]
    fn threshold_must_be_a_cosine_score() {
        for bad in [f32::NAN, f32::INFINITY, 2.0, -1.5] {
            let err = RagConfig::builder().similarity_threshold(bad).build().unwrap_err();
            assert!(matches!(err, RagError::Configuration(_)), "{bad} accepted");
        }
        assert!(RagConfig::builder().similarity_threshold(-1.0).build().is_ok());
        assert!(RagConfig::builder().similarity_threshold(0.35).build().is_ok());
    }

    #[test]
    fn zero_top_k_and_zero_chunk_are_rejected() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
    }
}
