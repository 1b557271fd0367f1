//! Hosted generation through any OpenAI-compatible chat completions API.
//!
//! Groq is the default endpoint. This module is only available when the
//! `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::{ModelError, Result};
use crate::generation::{GenerationConfig, TextGenerator};

/// Base URL of Groq's OpenAI-compatible API.
pub const GROQ_API_BASE: &str = "https://api.groq.com/openai/v1";

/// The model used when none is configured.
pub const DEFAULT_HOSTED_MODEL: &str = "llama3-8b-8192";

const BACKEND: &str = "OpenAI-compatible";

/// Connection settings for an [`OpenAICompatibleClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct HostedConfig {
    /// Bearer token sent with every request.
    pub api_key: String,
    /// API root, without the `/chat/completions` suffix.
    pub base_url: String,
    /// Model identifier.
    pub model: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl HostedConfig {
    /// Settings for Groq with the default model.
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: GROQ_API_BASE.to_string(),
            model: DEFAULT_HOSTED_MODEL.to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Use a different model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Use a different API root (any OpenAI-compatible service).
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

/// A [`TextGenerator`] backed by an OpenAI-compatible `/chat/completions` endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_model::openai::{HostedConfig, OpenAICompatibleClient};
///
/// let client = OpenAICompatibleClient::new(HostedConfig::groq("gsk-..."))?;
/// ```
pub struct OpenAICompatibleClient {
    client: reqwest::Client,
    config: HostedConfig,
    endpoint: String,
}

impl OpenAICompatibleClient {
    /// Create a new client.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Config`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: HostedConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(ModelError::Config("API key must not be empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ModelError::Config(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", config.base_url.trim_end_matches('/'));

        Ok(Self { client, config, endpoint })
    }

    /// The settings this client was built with.
    pub fn config(&self) -> &HostedConfig {
        &self.config
    }
}

// ── Chat completions request/response types ────────────────────────

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
pub(crate) struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ChatResponse {
    /// Text of the first choice, trimmed.
    pub(crate) fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|text| text.trim().to_string())
            .ok_or_else(|| ModelError::InvalidResponse {
                backend: BACKEND.into(),
                message: "response contained no message content".into(),
            })
    }
}

/// Pull the `error.message` field out of an error body, falling back to the raw body.
pub(crate) fn error_detail(body: String) -> String {
    serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body)
}

// ── TextGenerator implementation ───────────────────────────────────

#[async_trait]
impl TextGenerator for OpenAICompatibleClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String> {
        debug!(backend = BACKEND, model = %self.config.model, prompt_len = prompt.len(), "generating");

        let request_body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(backend = BACKEND, error = %e, "request failed");
                if e.is_timeout() {
                    ModelError::Timeout { after: self.config.timeout }
                } else {
                    ModelError::Request { backend: BACKEND.into(), message: e.to_string() }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(backend = BACKEND, %status, "API error");
            return Err(ModelError::Api {
                backend: BACKEND.into(),
                status: status.as_u16(),
                message: error_detail(body),
            });
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "failed to parse response");
            ModelError::InvalidResponse { backend: BACKEND.into(), message: e.to_string() }
        })?;

        chat.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        let err = OpenAICompatibleClient::new(HostedConfig::groq("")).err().unwrap();
        assert!(matches!(err, ModelError::Config(_)));
    }

    #[test]
    fn endpoint_ignores_trailing_slash() {
        let client = OpenAICompatibleClient::new(
            HostedConfig::groq("key").with_base_url("http://localhost:8080/v1/"),
        )
        .unwrap();
        assert_eq!(client.endpoint, "http://localhost:8080/v1/chat/completions");
    }

    #[test]
    fn extracts_first_choice_text() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"  Blue.\n"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.into_text().unwrap(), "Blue.");
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let parsed: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(parsed.into_text(), Err(ModelError::InvalidResponse { .. })));
    }

    #[test]
    fn error_detail_prefers_structured_message() {
        let body = r#"{"error":{"message":"rate limited","type":"tokens"}}"#.to_string();
        assert_eq!(error_detail(body), "rate limited");
        assert_eq!(error_detail("gateway timeout".into()), "gateway timeout");
    }
}
