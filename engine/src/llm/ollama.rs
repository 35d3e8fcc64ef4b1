//! Ollama LLM Provider
//!
//! This module implements the LLMProvider trait for Ollama, a local LLM provider.
//! Ollama runs models locally on the user's machine, typically at http://localhost:11434.
//!
//! Key features:
//! - Local execution (no API keys required)
//! - Non-streaming `/api/chat` calls
//! - `max_tokens` / `temperature` passed through Ollama's `options`

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{completion_text, http_client, ChatRequest, LLMError, LLMProvider, Result};

/// Ollama provider configuration
#[derive(Debug, Clone)]
pub struct OllamaProvider {
    /// Base URL for Ollama API (typically http://localhost:11434)
    base_url: String,

    /// HTTP client for API requests
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider with a five minute request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(300))
    }

    /// Create a new Ollama provider with an explicit request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: http_client(timeout)?,
        })
    }

    /// Convert a gateway request to Ollama's format
    fn build_request(&self, request: &ChatRequest) -> OllamaRequest {
        OllamaRequest {
            model: request.model.clone(),
            messages: request
                .messages
                .iter()
                .map(|msg| OllamaMessage {
                    role: msg.role.to_string(),
                    content: msg.content.clone(),
                })
                .collect(),
            stream: false,
            options: OllamaOptions {
                num_predict: request.max_tokens,
                temperature: request.temperature,
            },
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let body = self.build_request(request);

        tracing::debug!(
            "Ollama request: model={}, messages={}, total_chars={}",
            body.model,
            body.messages.len(),
            body.messages.iter().map(|m| m.content.len()).sum::<usize>()
        );

        let url = format!("{}/api/chat", self.base_url);
        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::from_transport(e, "Ollama", &self.base_url))?;

        tracing::info!(
            "Ollama response received in {:.1}s",
            start.elapsed().as_secs_f64()
        );

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, error_text));
        }

        let ollama_response: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LLMError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        Ok(completion_text(
            ollama_response.message.map(|m| m.content),
        ))
    }

    async fn check_health(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// Ollama API request format
#[derive(Debug, Serialize)]
struct OllamaRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    options: OllamaOptions,
}

/// Ollama sampling options
#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

/// Ollama message format
#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

/// Ollama API response format
#[derive(Debug, Deserialize)]
struct OllamaResponse {
    message: Option<OllamaMessage>,
}
