//! # docqa-model
//!
//! Text generation backends for DocQA.
//!
//! ## Overview
//!
//! Every component that needs a model talks to the [`TextGenerator`] trait:
//! one prompt in, one completion out, failures as [`ModelError`]. Two real
//! backends ship with the crate:
//!
//! - [`OpenAICompatibleClient`] - Groq or any OpenAI-compatible chat API
//! - [`OllamaClient`] - a model served by a local Ollama instance
//!
//! [`GeneratorBackend`] picks one of them at startup from the environment.
//! [`MockGenerator`] replays scripted replies for tests.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use docqa_model::{GenerationConfig, GeneratorBackend, TextGenerator};
//!
//! let backend = GeneratorBackend::from_env()?;
//! let text = backend.generate("Say hello.", &GenerationConfig::default()).await?;
//! ```

#[cfg(all(feature = "openai", feature = "ollama"))]
pub mod backend;
pub mod error;
pub mod generation;
pub mod mock;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;
pub mod summarize;

#[cfg(all(feature = "openai", feature = "ollama"))]
pub use backend::GeneratorBackend;
pub use error::{ModelError, Result};
pub use generation::{GenerationConfig, TextGenerator};
pub use mock::{MockGenerator, MockReply};
#[cfg(feature = "ollama")]
pub use ollama::{LocalConfig, OllamaClient};
#[cfg(feature = "openai")]
pub use openai::{HostedConfig, OpenAICompatibleClient};
pub use summarize::{ArticleSummarizer, PaperSummarizer};
