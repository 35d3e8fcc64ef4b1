use super::{completion_text, http_client, ChatRequest, LLMError, LLMProvider};
use crate::config::OpenAIConfig;
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

pub struct OpenAIProvider {
    config: OpenAIConfig,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAIProvider {
    pub fn new(
        config: OpenAIConfig,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> super::Result<Self> {
        Ok(Self {
            config,
            api_key: api_key.into(),
            client: http_client(timeout)?,
        })
    }

    pub fn from_env(config: OpenAIConfig, timeout: Duration) -> super::Result<Self> {
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| LLMError::AuthenticationFailed(format!("{} is not set", API_KEY_ENV)))?;
        Self::new(config, api_key, timeout)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn check_health(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn complete(&self, request: &ChatRequest) -> super::Result<String> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let api_messages: Vec<_> = request
            .messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.to_string(),
                    "content": msg.content
                })
            })
            .collect();

        let payload = json!({
            "model": request.model,
            "messages": api_messages,
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, "OpenAI", &self.config.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text));
        }

        let data: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        let choice = data
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .ok_or_else(|| LLMError::ParseError("No choices in response".to_string()))?;

        let content = choice
            .get("message")
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .map(str::to_string);

        Ok(completion_text(content))
    }
}
