//! Local generation through an Ollama server.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use ollama_rs::Ollama;
use ollama_rs::generation::completion::request::GenerationRequest;
use ollama_rs::models::ModelOptions;
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::generation::{GenerationConfig, TextGenerator};

/// Where a default Ollama install listens.
pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

/// The model used when none is configured.
pub const DEFAULT_LOCAL_MODEL: &str = "llama3";

const BACKEND: &str = "Ollama";

/// Connection settings for an [`OllamaClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct LocalConfig {
    /// Server root, e.g. `http://localhost:11434`.
    pub base_url: String,
    /// Model tag pulled into the local server.
    pub model: String,
    /// Per-request timeout. Local models are slow on CPU, so this is generous.
    pub timeout: Duration,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_BASE.to_string(),
            model: DEFAULT_LOCAL_MODEL.to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl LocalConfig {
    /// Settings for the given model on the default server.
    pub fn new(model: impl Into<String>) -> Self {
        Self { model: model.into(), ..Self::default() }
    }

    /// Use a different server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Use a different request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// A [`TextGenerator`] backed by an Ollama server through `ollama-rs`.
pub struct OllamaClient {
    ollama: Ollama,
    config: LocalConfig,
}

impl OllamaClient {
    /// Create a new client. No request is made until the first generation.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the model name is empty or the base
    /// URL is not an `http` or `https` URL with a host.
    pub fn new(config: LocalConfig) -> Result<Self> {
        if config.model.trim().is_empty() {
            return Err(ModelError::Config("local model name must not be empty".into()));
        }
        let (host, port) = split_base_url(&config.base_url)?;
        Ok(Self { ollama: Ollama::new(host, port), config })
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &LocalConfig {
        &self.config
    }
}

/// Split a server root into the `scheme://host` and port `Ollama::new` takes.
fn split_base_url(base_url: &str) -> Result<(String, u16)> {
    let invalid = |reason: &str| ModelError::Config(format!("invalid Ollama base URL '{base_url}': {reason}"));
    let url = reqwest::Url::parse(base_url).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    let host = url.host_str().ok_or_else(|| invalid("missing host"))?;
    let port = url.port_or_known_default().ok_or_else(|| invalid("missing port"))?;
    Ok((format!("{}://{host}", url.scheme()), port))
}

fn model_options(config: &GenerationConfig) -> ModelOptions {
    ModelOptions::default()
        .temperature(config.temperature)
        .top_p(config.top_p)
        .num_predict(i32::try_from(config.max_tokens).unwrap_or(i32::MAX))
}

#[async_trait]
impl TextGenerator for OllamaClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        debug!(backend = BACKEND, model = %self.config.model, prompt_len = prompt.len(), "generating");

        let request =
            GenerationRequest::new(self.config.model.clone(), prompt.to_string()).options(model_options(config));

        let response = tokio::time::timeout(self.config.timeout, self.ollama.generate(request))
            .await
            .map_err(|_| {
                error!(backend = BACKEND, after = ?self.config.timeout, "request timed out");
                ModelError::Timeout { after: self.config.timeout }
            })?
            .map_err(|e| {
                error!(backend = BACKEND, error = %e, "request failed");
                ModelError::Request { backend: BACKEND.into(), message: e.to_string() }
            })?;

        let text = response.response.trim();
        if text.is_empty() {
            return Err(ModelError::InvalidResponse {
                backend: BACKEND.into(),
                message: "model returned an empty response".into(),
            });
        }
        Ok(text.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_model_is_rejected() {
        assert!(matches!(OllamaClient::new(LocalConfig::new("  ")), Err(ModelError::Config(_))));
    }

    #[test]
    fn base_url_is_split_into_host_and_port() {
        assert_eq!(split_base_url("http://gpu-box:11434/").unwrap(), ("http://gpu-box".to_string(), 11434));
        assert_eq!(split_base_url(DEFAULT_OLLAMA_BASE).unwrap(), ("http://localhost".to_string(), 11434));
        assert_eq!(split_base_url("https://ollama.internal").unwrap(), ("https://ollama.internal".to_string(), 443));
    }

    #[test]
    fn unusable_base_url_is_a_config_error() {
        for url in ["localhost:11434", "ftp://host:21", "not a url"] {
            let err = OllamaClient::new(LocalConfig::default().with_base_url(url)).err();
            assert!(matches!(err, Some(ModelError::Config(_))), "{url} accepted");
        }
    }

    #[test]
    fn client_is_named_after_its_model() {
        let client = OllamaClient::new(LocalConfig::new("mistral").with_base_url("http://gpu-box:11434")).unwrap();
        assert_eq!(client.name(), "mistral");
        assert_eq!(client.config().timeout, Duration::from_secs(300));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_request_error() {
        // Port 9 (discard) is closed on loopback.
        let client = OllamaClient::new(LocalConfig::new("llama3").with_base_url("http://127.0.0.1:9")).unwrap();
        let err = client.generate("hi", &GenerationConfig::default()).await.unwrap_err();
        assert!(matches!(err, ModelError::Request { .. }), "{err:?}");
    }
}
