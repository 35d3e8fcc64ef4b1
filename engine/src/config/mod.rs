//! Configuration management
//!
//! This module handles loading, validation, and management of the Taskpal configuration.
//! Configuration is stored in TOML format at ~/.taskpal/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Gateway provider selection, completion defaults, per-provider settings
//! - **session**: History bound and chat context window
//! - **store**: Keyed store backend and location
//! - **server**: HTTP front door bind address
//!
//! # Path Expansion
//!
//! The configuration system automatically:
//! - Expands ~ to the user's home directory
//! - Creates the data directory if it doesn't exist
//!
//! # Examples
//!
//! ```no_run
//! use taskpal_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Data dir: {:?}", config.core.data_dir);
//! println!("Default provider: {}", config.llm.default_provider);
//! # Ok(())
//! # }
//! ```

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
///
/// Every section except `core` and `llm` may be omitted from the file and
/// falls back to its defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// LLM gateway configuration
    pub llm: LLMConfig,

    /// Session policy
    #[serde(default)]
    pub session: SessionConfig,

    /// Keyed store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Provider used for chat fallback (ollama, workers_ai, openai)
    pub default_provider: String,

    /// Maximum tokens requested per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature (0.0-2.0)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Ollama provider settings
    #[serde(default)]
    pub ollama: OllamaConfig,

    /// Cloudflare Workers AI provider settings
    #[serde(default)]
    pub workers_ai: WorkersAiConfig,

    /// OpenAI-compatible provider settings
    #[serde(default)]
    pub openai: OpenAIConfig,
}

/// Ollama provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Base URL for Ollama API
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_ollama_model")]
    pub model: String,
}

/// Cloudflare Workers AI provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkersAiConfig {
    /// Base URL for the Cloudflare REST API
    #[serde(default = "default_workers_ai_base_url")]
    pub base_url: String,

    /// Cloudflare account identifier
    #[serde(default)]
    pub account_id: String,

    /// Model identifier
    #[serde(default = "default_workers_ai_model")]
    pub model: String,
    // Note: API token read from CLOUDFLARE_API_TOKEN, not stored in config
}

/// OpenAI-compatible provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Base URL for OpenAI API
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,

    /// Model name
    #[serde(default = "default_openai_model")]
    pub model: String,
    // Note: API key read from OPENAI_API_KEY, not stored in config
}

/// Session policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Messages retained per session after every turn
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Prior messages supplied to the gateway on chat fallback
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            context_window: default_context_window(),
        }
    }
}

/// Keyed store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Backend kind (sqlite, memory)
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database path (supports ~ expansion, defaults to <data_dir>/sessions.db)
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.taskpal")
}

fn default_max_tokens() -> u32 {
    512
}

fn default_temperature() -> f32 {
    0.7
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.1:8b".to_string()
}

fn default_workers_ai_base_url() -> String {
    "https://api.cloudflare.com/client/v4".to_string()
}

fn default_workers_ai_model() -> String {
    "@cf/meta/llama-3.3-70b-instruct-fp8-fast".to_string()
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_history_limit() -> usize {
    10
}

fn default_context_window() -> usize {
    4
}

fn default_store_backend() -> String {
    "sqlite".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_ollama_model(),
        }
    }
}

impl Default for WorkersAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_workers_ai_base_url(),
            account_id: String::new(),
            model: default_workers_ai_model(),
        }
    }
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            model: default_openai_model(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            default_provider: "ollama".to_string(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            ollama: OllamaConfig::default(),
            workers_ai: WorkersAiConfig::default(),
            openai: OpenAIConfig::default(),
        }
    }
}

impl LLMConfig {
    /// Model identifier of the selected provider
    pub fn active_model(&self) -> &str {
        match self.default_provider.as_str() {
            "workers_ai" => &self.workers_ai.model,
            "openai" => &self.openai.model,
            _ => &self.ollama.model,
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.taskpal/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let mut config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let mut config = Self::default_config();

        // Serialize before processing so the file keeps the portable ~ paths
        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        config.validate_and_process()?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.taskpal/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".taskpal").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
                data_dir: default_data_dir(),
            },
            llm: LLMConfig::default(),
            session: SessionConfig::default(),
            store: StoreConfig::default(),
            server: ServerConfig::default(),
        }
    }

    /// Resolved SQLite database path
    pub fn store_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| self.core.data_dir.join("sessions.db"))
    }

    /// Validate and process configuration
    ///
    /// This method:
    /// - Validates enumerated and numeric fields
    /// - Expands ~ in paths
    /// - Creates the data directory if it doesn't exist
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;
        if let Some(path) = &self.store.path {
            self.store.path = Some(expand_path(path)?);
        }

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }

    /// Validate field values without touching the file system
    pub fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        let valid_providers = ["ollama", "workers_ai", "openai"];
        if !valid_providers.contains(&self.llm.default_provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid default provider '{}'. Must be one of: {}",
                self.llm.default_provider,
                valid_providers.join(", ")
            )));
        }

        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(EngineError::Config(
                "temperature must be between 0.0 and 2.0".to_string(),
            ));
        }

        if self.llm.max_tokens == 0 {
            return Err(EngineError::Config(
                "max_tokens must be greater than 0".to_string(),
            ));
        }

        if self.session.history_limit < 2 {
            return Err(EngineError::Config(
                "history_limit must be at least 2".to_string(),
            ));
        }

        if self.session.context_window > self.session.history_limit {
            return Err(EngineError::Config(format!(
                "context_window ({}) must not exceed history_limit ({})",
                self.session.context_window, self.session.history_limit
            )));
        }

        let valid_backends = ["sqlite", "memory"];
        if !valid_backends.contains(&self.store.backend.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid store backend '{}'. Must be one of: {}",
                self.store.backend,
                valid_backends.join(", ")
            )));
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
