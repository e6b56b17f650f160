//! HTTP LLM providers.
//!
//! A thin unified interface over the completion APIs the backend can talk
//! to. Model, temperature, and timeouts are fixed at construction from
//! configuration; the engine never varies them per call.

mod anthropic;
mod openai;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

use async_trait::async_trait;
use insight_common::{Error, LlmConfig, Result};
use std::sync::Arc;

/// Unified interface for LLM providers.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send a single-shot chat completion and return the response text.
    async fn chat(&self, system: Option<&str>, message: &str) -> Result<String>;
}

/// Build the configured provider.
pub fn from_config(config: &LlmConfig) -> Result<Arc<dyn Provider>> {
    match config.provider.as_str() {
        "anthropic" => {
            let api_key = config
                .anthropic_api_key
                .clone()
                .ok_or_else(|| Error::Config("ANTHROPIC_API_KEY is not set".into()))?;
            Ok(Arc::new(AnthropicProvider::new(api_key, config)))
        }
        "openai" => {
            let api_key = config
                .openai_api_key
                .clone()
                .ok_or_else(|| Error::Config("OPENAI_API_KEY is not set".into()))?;
            Ok(Arc::new(OpenAiProvider::new(api_key, config)))
        }
        other => Err(Error::Config(format!(
            "unknown llm provider '{other}' (expected \"anthropic\" or \"openai\")"
        ))),
    }
}

/// Map a reqwest transport failure onto the engine error taxonomy.
pub(crate) fn transport_error(provider: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Timeout
    } else {
        Error::External(format!("{provider} request failed: {err}"))
    }
}
