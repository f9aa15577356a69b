//! Tracker Assistant LLM
//!
//! Provides a unified interface for the model providers the assistant talks to:
//! - Google Gemini (`generateContent` with function declarations)
//! - OpenAI and OpenAI-compatible chat completions
//!
//! Also includes tool-schema normalization and the HTTP client factory.

pub mod gemini;
pub mod http_client;
pub mod openai;
pub mod provider;
pub mod schema;
pub mod types;

use std::sync::Arc;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::LlmProvider;
pub use schema::normalize_tool;
pub use types::*;

/// Construct the provider named by the configuration.
pub fn create_provider(config: ProviderConfig) -> LlmResult<Arc<dyn LlmProvider>> {
    match config.provider {
        ProviderType::Gemini => Ok(Arc::new(GeminiProvider::new(config)?)),
        ProviderType::OpenAI => Ok(Arc::new(OpenAIProvider::new(config)?)),
    }
}
