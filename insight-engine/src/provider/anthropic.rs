//! Anthropic (Claude) provider implementation.

use super::{transport_error, Provider};
use async_trait::async_trait;
use insight_common::{Error, LlmConfig, Result};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Anthropic API provider.
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AnthropicProvider {
    /// Create a provider from configuration.
    pub fn new(api_key: impl Into<String>, config: &LlmConfig) -> Self {
        let api_key = api_key.into();
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key).unwrap_or_else(|_| HeaderValue::from_static("")),
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.generate_timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| "https://api.anthropic.com".into()),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    temperature: f64,
}

#[derive(Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl Provider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn chat(&self, system: Option<&str>, message: &str) -> Result<String> {
        let url = format!("{}/v1/messages", self.base_url);

        let request = AnthropicRequest {
            model: &self.model,
            messages: vec![AnthropicMessage {
                role: "user",
                content: message,
            }],
            max_tokens: self.max_tokens,
            system,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| transport_error("anthropic", e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::External(format!(
                "anthropic API error {status}: {body}"
            )));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| Error::External(format!("anthropic response parse failed: {e}")))?;

        let text = parsed
            .content
            .iter()
            .filter(|block| block.content_type == "text")
            .map(|block| block.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serialization_shape() {
        let request = AnthropicRequest {
            model: "claude-3-5-sonnet-20241022",
            messages: vec![AnthropicMessage {
                role: "user",
                content: "Hello",
            }],
            max_tokens: 256,
            system: Some("Be brief."),
            temperature: 0.3,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "claude-3-5-sonnet-20241022");
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["system"], "Be brief.");
    }

    #[test]
    fn response_text_blocks_are_joined() {
        let body = r#"{"content":[{"type":"text","text":"Hello "},{"type":"text","text":"admin"}]}"#;
        let parsed: AnthropicResponse = serde_json::from_str(body).unwrap();
        let text: String = parsed
            .content
            .iter()
            .filter(|b| b.content_type == "text")
            .map(|b| b.text.as_str())
            .collect();
        assert_eq!(text, "Hello admin");
    }

    #[test]
    fn base_url_defaults_to_public_api() {
        let provider = AnthropicProvider::new("sk-test", &LlmConfig::default());
        assert_eq!(provider.base_url, "https://api.anthropic.com");
        assert_eq!(provider.name(), "anthropic");
    }
}
