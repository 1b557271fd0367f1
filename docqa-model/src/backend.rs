//! Construction-time selection between the hosted and local generators.

use async_trait::async_trait;
use tracing::info;

use crate::error::Result;
use crate::generation::{GenerationConfig, TextGenerator};
use crate::ollama::{LocalConfig, OllamaClient};
use crate::openai::{HostedConfig, OpenAICompatibleClient};

/// Environment variable holding the hosted API key. Its presence selects the hosted backend.
pub const GROQ_API_KEY: &str = "GROQ_API_KEY";
/// Optional hosted model override.
pub const GROQ_MODEL_ID: &str = "GROQ_MODEL_ID";
/// Optional hosted API root override.
pub const GROQ_BASE_URL: &str = "GROQ_BASE_URL";
/// Optional local model override.
pub const LOCAL_MODEL_ID: &str = "LOCAL_MODEL_ID";
/// Optional local server override.
pub const OLLAMA_BASE_URL: &str = "OLLAMA_BASE_URL";

/// The closed set of generation backends.
///
/// Picked once at startup and then shared by reference; nothing downstream
/// inspects which variant it is talking to.
pub enum GeneratorBackend {
    /// A hosted OpenAI-compatible API (Groq by default).
    Hosted(OpenAICompatibleClient),
    /// A model served by a local Ollama instance.
    Local(OllamaClient),
}

impl GeneratorBackend {
    /// Select a backend from the process environment.
    ///
    /// See [`from_lookup`](Self::from_lookup) for the rules.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Select a backend using `lookup` to read settings.
    ///
    /// A non-empty `GROQ_API_KEY` selects the hosted backend (with optional
    /// `GROQ_MODEL_ID` / `GROQ_BASE_URL`); otherwise the local backend is used
    /// with `LOCAL_MODEL_ID` / `OLLAMA_BASE_URL` or their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(api_key) = get(GROQ_API_KEY) {
            let mut config = HostedConfig::groq(api_key);
            if let Some(model) = get(GROQ_MODEL_ID) {
                config = config.with_model(model);
            }
            if let Some(base_url) = get(GROQ_BASE_URL) {
                config = config.with_base_url(base_url);
            }
            info!(backend = "hosted", model = %config.model, "selected generation backend");
            return Ok(GeneratorBackend::Hosted(OpenAICompatibleClient::new(config)?));
        }

        let mut config = LocalConfig::default();
        if let Some(model) = get(LOCAL_MODEL_ID) {
            config.model = model;
        }
        if let Some(base_url) = get(OLLAMA_BASE_URL) {
            config = config.with_base_url(base_url);
        }
        info!(backend = "local", model = %config.model, "selected generation backend");
        Ok(GeneratorBackend::Local(OllamaClient::new(config)?))
    }

    /// Short label of the active variant.
    pub fn kind(&self) -> &'static str {
        match self {
            GeneratorBackend::Hosted(_) => "hosted",
            GeneratorBackend::Local(_) => "local",
        }
    }
}

#[async_trait]
impl TextGenerator for GeneratorBackend {
    fn name(&self) -> &str {
        match self {
            GeneratorBackend::Hosted(client) => client.name(),
            GeneratorBackend::Local(client) => client.name(),
        }
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        match self {
            GeneratorBackend::Hosted(client) => client.generate(prompt, config).await,
            GeneratorBackend::Local(client) => client.generate(prompt, config).await,
        }
    }
}
