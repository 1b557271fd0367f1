//! Scriptable generator for tests and offline demos.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{ModelError, Result};
use crate::generation::{GenerationConfig, TextGenerator};

/// One scripted outcome of a [`MockGenerator`] call.
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Return this text.
    Text(String),
    /// Fail with [`ModelError::Timeout`].
    Timeout(Duration),
    /// Fail with [`ModelError::Api`].
    ApiError {
        /// HTTP status to report.
        status: u16,
        /// Error detail to report.
        message: String,
    },
}

/// A [`TextGenerator`] that replays scripted replies and records every prompt.
///
/// Scripted replies are consumed in order; once the script is exhausted the
/// fallback reply is returned for every further call.
///
/// # Example
///
/// ```rust
/// use docqa_model::{MockGenerator, MockReply};
///
/// let generator = MockGenerator::new("mock")
///     .with_reply(MockReply::Text("The sky is blue.".into()));
/// ```
#[derive(Debug)]
pub struct MockGenerator {
    name: String,
    script: Mutex<VecDeque<MockReply>>,
    fallback: MockReply,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl MockGenerator {
    /// Create a mock that answers `"mock answer"` unless scripted otherwise.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: MockReply::Text("mock answer".into()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply for the next unscripted call.
    pub fn with_reply(mut self, reply: MockReply) -> Self {
        self.script.get_mut().push_back(reply);
        self
    }

    /// Set the reply used once the script runs out.
    pub fn with_fallback(mut self, reply: MockReply) -> Self {
        self.fallback = reply;
        self
    }

    /// Wait this long before replying.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every prompt received so far, in call order.
    pub async fn prompts(&self) -> Vec<String> {
        self.prompts.lock().await.clone()
    }

    /// Number of calls made so far.
    pub async fn call_count(&self) -> usize {
        self.prompts.lock().await.len()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, _config: &GenerationConfig) -> Result<String> {
        self.prompts.lock().await.push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let reply = self.script.lock().await.pop_front().unwrap_or_else(|| self.fallback.clone());
        match reply {
            MockReply::Text(text) => Ok(text),
            MockReply::Timeout(after) => Err(ModelError::Timeout { after }),
            MockReply::ApiError { status, message } => {
                Err(ModelError::Api { backend: self.name.clone(), status, message })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_then_fallback() {
        let generator = MockGenerator::new("mock")
            .with_reply(MockReply::Text("first".into()))
            .with_reply(MockReply::Timeout(Duration::from_secs(30)));
        let config = GenerationConfig::default();

        assert_eq!(generator.generate("a", &config).await.unwrap(), "first");
        assert!(generator.generate("b", &config).await.unwrap_err().is_timeout());
        assert_eq!(generator.generate("c", &config).await.unwrap(), "mock answer");
        assert_eq!(generator.prompts().await, vec!["a", "b", "c"]);
    }
}
