//! LLM provider implementations.
//!
//! Every supported backend speaks the OpenAI chat completions format
//! (OpenAI, Azure, Ollama, vLLM, LM Studio). Use `create_provider()` to
//! instantiate one from config.

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatibleProvider;

/// Create an LLM provider based on the configuration.
///
/// A missing API key does not fail here: the returned provider reports
/// `has_credentials() == false` and the invoker turns that into a
/// "not configured" scoring error without touching the network.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    if !matches!(config.provider.as_str(), "openai" | "azure" | "local") {
        tracing::warn!(
            provider = %config.provider,
            "Unknown provider; treating it as OpenAI-compatible"
        );
    }
    Ok(Arc::new(OpenAiCompatibleProvider::new(config)?))
}
