//! LLM Gateway Abstraction Layer
//!
//! The session engine's chat fallback talks to a stateless text-completion
//! service through the `LLMProvider` trait. Concrete providers (Ollama,
//! Cloudflare Workers AI, OpenAI-compatible) translate a `ChatRequest` into
//! their wire format and return the completion text.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::config::LLMConfig;

pub mod ollama;
pub mod openai;
pub mod workers_ai;

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

/// Reply used when a provider answers with no text at all
pub const EMPTY_COMPLETION_REPLY: &str = "I'm not sure how to respond to that.";

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    ParseError(String),
}

impl LLMError {
    /// Map a transport-level `reqwest` failure
    pub(crate) fn from_transport(err: reqwest::Error, provider: &str, base_url: &str) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else if err.is_connect() {
            LLMError::ProviderUnavailable(format!(
                "Cannot connect to {} at {}",
                provider, base_url
            ))
        } else {
            LLMError::NetworkError(err.to_string())
        }
    }

    /// Map a non-success HTTP status
    pub(crate) fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => LLMError::AuthenticationFailed(body),
            429 => LLMError::RateLimitExceeded,
            500..=599 => LLMError::ProviderUnavailable(format!("{}: {}", status, body)),
            _ => LLMError::InvalidRequest(format!("{}: {}", status, body)),
        }
    }
}

/// Message in a conversation history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Role of the message sender (user, assistant, system)
    pub role: MessageRole,

    /// Content of the message
    pub content: String,
}

impl Message {
    /// Create a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }

    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }
}

/// Role of a message sender
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// User message
    User,

    /// Assistant message
    Assistant,

    /// System message
    System,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::System => write!(f, "system"),
        }
    }
}

/// One completion request: `{model, messages, max_tokens, temperature}`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ChatRequest {
    /// Create a request with the given model and sampling defaults
    pub fn new(
        model: impl Into<String>,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f32,
    ) -> Self {
        Self {
            model: model.into(),
            messages,
            max_tokens,
            temperature,
        }
    }
}

/// LLM Provider trait that all gateway backends implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Returns the name of the provider (e.g., "ollama", "workers_ai")
    fn name(&self) -> &str;

    /// Returns true if this is a local provider (e.g., Ollama)
    fn is_local(&self) -> bool;

    /// Run one completion and return the generated text
    ///
    /// An empty completion is returned as `EMPTY_COMPLETION_REPLY` rather
    /// than as an empty string.
    async fn complete(&self, request: &ChatRequest) -> Result<String>;

    /// Check if the provider is currently healthy and available
    /// Default implementation returns true.
    async fn check_health(&self) -> bool {
        true
    }
}

/// Normalize raw completion text from a provider
pub(crate) fn completion_text(raw: Option<String>) -> String {
    match raw {
        Some(text) if !text.trim().is_empty() => text,
        _ => EMPTY_COMPLETION_REPLY.to_string(),
    }
}

/// Build a shared HTTP client with the configured timeout
pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LLMError::InvalidRequest(format!("Failed to create HTTP client: {}", e)))
}

/// Construct the provider selected by `default_provider`
pub fn build_provider(config: &LLMConfig) -> Result<Arc<dyn LLMProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    let provider: Arc<dyn LLMProvider> = match config.default_provider.as_str() {
        "ollama" => Arc::new(ollama::OllamaProvider::with_timeout(
            config.ollama.base_url.clone(),
            timeout,
        )?),
        "workers_ai" => Arc::new(workers_ai::WorkersAiProvider::from_env(
            config.workers_ai.clone(),
            timeout,
        )?),
        "openai" => Arc::new(openai::OpenAIProvider::from_env(
            config.openai.clone(),
            timeout,
        )?),
        other => {
            return Err(LLMError::InvalidRequest(format!(
                "Unknown provider: {}",
                other
            )))
        }
    };

    tracing::debug!(provider = provider.name(), "LLM provider ready");
    Ok(provider)
}
