//! Embeddings from any OpenAI-compatible `/embeddings` endpoint.
//!
//! This module is only available when the `openai` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// Default API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Default embedding model.
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// Dimensionality of [`DEFAULT_MODEL`].
pub const DEFAULT_DIMENSIONS: usize = 1536;

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "EMBEDDING_API_KEY";
/// Environment variable overriding the base URL.
pub const ENV_BASE_URL: &str = "EMBEDDING_BASE_URL";
/// Environment variable overriding the model.
pub const ENV_MODEL: &str = "EMBEDDING_MODEL";
/// Environment variable overriding the output dimensions.
pub const ENV_DIMENSIONS: &str = "EMBEDDING_DIMENSIONS";

const PROVIDER: &str = "OpenAI";

/// An [`EmbeddingProvider`] calling an OpenAI-compatible embeddings API.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?
///     .with_base_url("http://localhost:8080/v1")
///     .with_dimensions(384);
/// let embedding = provider.embed("hello world").await?;
/// ```
#[derive(Debug, Clone)]
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: String,
    dimensions: usize,
    request_dimensions: Option<usize>,
}

impl OpenAIEmbeddingProvider {
    /// Create a provider for the default endpoint and model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `api_key` is blank.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::Configuration("embedding API key must not be empty".into()));
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            endpoint: endpoint_for(DEFAULT_BASE_URL),
            model: DEFAULT_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
        })
    }

    /// Build from the environment, or `None` if no API key is set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Configuration`] if `EMBEDDING_DIMENSIONS` is not a
    /// positive integer.
    pub fn from_env() -> Result<Option<Self>> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    ///
    /// # Errors
    ///
    /// See [`from_env`](Self::from_env).
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let Some(api_key) = get(ENV_API_KEY) else { return Ok(None) };

        let mut provider = Self::new(api_key)?;
        if let Some(base_url) = get(ENV_BASE_URL) {
            provider = provider.with_base_url(&base_url);
        }
        if let Some(model) = get(ENV_MODEL) {
            provider = provider.with_model(model);
        }
        if let Some(raw) = get(ENV_DIMENSIONS) {
            let dims = raw.trim().parse::<usize>().ok().filter(|d| *d > 0).ok_or_else(|| {
                RagError::Configuration(format!("{ENV_DIMENSIONS} must be a positive integer, got '{raw}'"))
            })?;
            provider = provider.with_dimensions(dims);
        }
        Ok(Some(provider))
    }

    /// Point at another OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.endpoint = endpoint_for(base_url);
        self
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Request `dims`-sized vectors; also changes [`dimensions()`](EmbeddingProvider::dimensions).
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// The full embeddings URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The model name.
    pub fn model(&self) -> &str {
        &self.model
    }
}

fn endpoint_for(base_url: &str) -> String {
    format!("{}/embeddings", base_url.trim_end_matches('/'))
}

fn embedding_error(message: String) -> RagError {
    RagError::Embedding { provider: PROVIDER.into(), message }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl EmbeddingResponse {
    /// Vectors in input order, checked against the expected count and size.
    fn into_vectors(mut self, expected: usize, dimensions: usize) -> Result<Vec<Vec<f32>>> {
        if self.data.len() != expected {
            return Err(embedding_error(format!(
                "expected {expected} embeddings, got {}",
                self.data.len()
            )));
        }
        self.data.sort_by_key(|d| d.index);
        self.data
            .into_iter()
            .map(|d| {
                if d.embedding.len() == dimensions {
                    Ok(d.embedding)
                } else {
                    Err(embedding_error(format!(
                        "embedding {} has {} dimensions, expected {dimensions}",
                        d.index,
                        d.embedding.len()
                    )))
                }
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text]).await?;
        results.into_iter().next().ok_or_else(|| embedding_error("API returned empty response".into()))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = PROVIDER, batch_size = texts.len(), model = %self.model, "embedding batch");

        let body =
            EmbeddingRequest { model: &self.model, input: texts, dimensions: self.request_dimensions };
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "request failed");
                embedding_error(format!("request failed: {e}"))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail =
                serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
            error!(provider = PROVIDER, %status, "API error");
            return Err(embedding_error(format!("API returned {status}: {detail}")));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse response");
            embedding_error(format!("failed to parse response: {e}"))
        })?;
        parsed.into_vectors(texts.len(), self.dimensions)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn missing_key_means_no_provider() {
        assert!(OpenAIEmbeddingProvider::from_lookup(lookup(&[])).unwrap().is_none());
        assert!(OpenAIEmbeddingProvider::from_lookup(lookup(&[(ENV_API_KEY, "  ")])).unwrap().is_none());
    }

    #[test]
    fn environment_overrides_are_applied() {
        let provider = OpenAIEmbeddingProvider::from_lookup(lookup(&[
            (ENV_API_KEY, "key"),
            (ENV_BASE_URL, "http://localhost:8080/v1/"),
            (ENV_MODEL, "all-minilm"),
            (ENV_DIMENSIONS, "384"),
        ]))
        .unwrap()
        .unwrap();

        assert_eq!(provider.endpoint(), "http://localhost:8080/v1/embeddings");
        assert_eq!(provider.model(), "all-minilm");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn bad_dimensions_are_configuration_errors() {
        let err = OpenAIEmbeddingProvider::from_lookup(lookup(&[
            (ENV_API_KEY, "key"),
            (ENV_DIMENSIONS, "zero"),
        ]))
        .unwrap_err();
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn response_vectors_follow_input_order() {
        let response: EmbeddingResponse = serde_json::from_str(
            r#"{"data":[{"index":1,"embedding":[0.0,1.0]},{"index":0,"embedding":[1.0,0.0]}]}"#,
        )
        .unwrap();
        let vectors = response.into_vectors(2, 2).unwrap();
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[test]
    fn short_responses_are_embedding_errors() {
        let response: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"index":0,"embedding":[1.0]}]}"#).unwrap();
        assert!(matches!(response.into_vectors(2, 1), Err(RagError::Embedding { .. })));
    }
}
