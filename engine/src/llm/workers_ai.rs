//! Cloudflare Workers AI provider
//!
//! Calls the Workers AI REST endpoint
//! `POST {base_url}/accounts/{account_id}/ai/run/{model}` with
//! `{messages, max_tokens, temperature}` and reads `result.response`.
//! The API token comes from the `CLOUDFLARE_API_TOKEN` environment variable.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{completion_text, http_client, ChatRequest, LLMError, LLMProvider, Message, Result};
use crate::config::WorkersAiConfig;

/// Environment variable holding the Cloudflare API token
pub const API_TOKEN_ENV: &str = "CLOUDFLARE_API_TOKEN";

pub struct WorkersAiProvider {
    config: WorkersAiConfig,
    api_token: String,
    client: Client,
}

impl WorkersAiProvider {
    pub fn new(config: WorkersAiConfig, api_token: impl Into<String>, timeout: Duration) -> Result<Self> {
        if config.account_id.is_empty() {
            return Err(LLMError::InvalidRequest(
                "workers_ai.account_id is not configured".to_string(),
            ));
        }

        Ok(Self {
            config,
            api_token: api_token.into(),
            client: http_client(timeout)?,
        })
    }

    /// Build a provider using the token from `CLOUDFLARE_API_TOKEN`
    pub fn from_env(config: WorkersAiConfig, timeout: Duration) -> Result<Self> {
        let token = std::env::var(API_TOKEN_ENV).map_err(|_| {
            LLMError::AuthenticationFailed(format!("{} is not set", API_TOKEN_ENV))
        })?;
        Self::new(config, token, timeout)
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/accounts/{}/ai/run/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.account_id,
            model
        )
    }
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct RunResponse {
    result: Option<RunResult>,
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RunResult {
    response: Option<String>,
}

#[async_trait]
impl LLMProvider for WorkersAiProvider {
    fn name(&self) -> &str {
        "workers_ai"
    }

    fn is_local(&self) -> bool {
        false
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let url = self.endpoint(&request.model);
        let body = RunRequest {
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        tracing::debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Workers AI request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, "Workers AI", &self.config.base_url))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text));
        }

        let data: RunResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(e.to_string()))?;

        if !data.success {
            return Err(LLMError::InvalidRequest(format!(
                "Workers AI reported failure: {}",
                serde_json::Value::Array(data.errors)
            )));
        }

        Ok(completion_text(data.result.and_then(|r| r.response)))
    }

    async fn check_health(&self) -> bool {
        !self.api_token.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> WorkersAiConfig {
        WorkersAiConfig {
            account_id: "acct123".to_string(),
            ..WorkersAiConfig::default()
        }
    }

    #[test]
    fn test_endpoint_includes_account_and_model() {
        let provider = WorkersAiProvider::new(config(), "token", Duration::from_secs(5)).unwrap();
        assert_eq!(
            provider.endpoint("@cf/meta/llama-3.3-70b-instruct-fp8-fast"),
            "https://api.cloudflare.com/client/v4/accounts/acct123/ai/run/@cf/meta/llama-3.3-70b-instruct-fp8-fast"
        );
        assert!(!provider.is_local());
    }

    #[test]
    fn test_missing_account_rejected() {
        let result = WorkersAiProvider::new(
            WorkersAiConfig::default(),
            "token",
            Duration::from_secs(5),
        );
        assert!(matches!(result, Err(LLMError::InvalidRequest(_))));
    }
}
