//! Tests for backend selection and the live generation round trip.
//!
//! The live tests need a reachable service and are ignored by default.
//! Run with: cargo test -p docqa-model --test backend_tests -- --ignored

use std::sync::Arc;

use docqa_model::{
    GenerationConfig, GeneratorBackend, MockGenerator, MockReply, PaperSummarizer, TextGenerator,
};

/// Verify every backend implements TextGenerator (compile-time check)
fn _assert_generator_impl<T: TextGenerator>() {}

#[test]
fn test_backends_implement_text_generator() {
    _assert_generator_impl::<GeneratorBackend>();
    _assert_generator_impl::<docqa_model::OpenAICompatibleClient>();
    _assert_generator_impl::<docqa_model::OllamaClient>();
    _assert_generator_impl::<MockGenerator>();
}

#[test]
fn test_default_generation_config_matches_chatbot_settings() {
    let config = GenerationConfig::default();
    assert_eq!(config.temperature, 0.2);
    assert_eq!(config.top_p, 0.9);
    assert_eq!(config.max_tokens, 1024);
}

#[tokio::test]
async fn test_summarizer_surfaces_api_errors() {
    let mock = Arc::new(MockGenerator::new("mock").with_reply(MockReply::ApiError {
        status: 429,
        message: "rate limit reached".into(),
    }));
    let summarizer = PaperSummarizer::new(mock);

    let err = summarizer.summarize("Title", "Abstract").await.unwrap_err();
    assert!(err.to_string().contains("429"));
    assert!(!err.is_timeout());
}

#[tokio::test]
#[ignore = "Requires GROQ_API_KEY or a running Ollama server"]
async fn test_live_generation() {
    let backend = GeneratorBackend::from_env().expect("backend should build");
    let text = backend
        .generate("Reply with the single word: ready", &GenerationConfig::default())
        .await
        .expect("generation should succeed");
    assert!(!text.is_empty());
}
