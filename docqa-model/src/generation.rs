//! The generation capability: prompt in, text out.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Sampling parameters passed with every generation call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GenerationConfig {
    /// Sampling temperature.
    pub temperature: f32,
    /// Nucleus sampling probability mass.
    pub top_p: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { temperature: 0.2, top_p: 0.9, max_tokens: 1024 }
    }
}

impl GenerationConfig {
    /// Override the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Override the nucleus sampling probability mass.
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }

    /// Override the token limit.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

/// A backend that turns a single prompt into a single completion.
///
/// Calls are one-shot: no streaming, no tool use, no implicit retry. A failed
/// or timed-out call surfaces as a [`ModelError`](crate::ModelError) and the
/// caller decides what to do with it.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_model::{GenerationConfig, TextGenerator};
///
/// let answer = generator.generate("Say hi.", &GenerationConfig::default()).await?;
/// ```
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Identifier of the model behind this generator, used in logs.
    fn name(&self) -> &str;

    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String>;
}
