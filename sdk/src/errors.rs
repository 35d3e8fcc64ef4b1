//! Error types and handling
//!
//! This module provides the error types used throughout the Taskpal engine.
//! All errors implement the `EngineErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! All error messages are scrubbed to ensure:
//! - No secrets (API keys, tokens) are included
//! - No session contents are echoed back to remote callers

use thiserror::Error;

/// Trait for Taskpal error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait EngineErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain
    /// secrets or internal implementation details.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried (a failed turn may simply be sent
    /// again). Non-recoverable errors require operator intervention.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Store**: Keyed store load/save failures (fatal for a turn)
/// - **Request**: Unparseable inbound requests
/// - **Serialization**: Session state that cannot be encoded or decoded
/// - **Network**: Listener and socket failures
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EngineErrorExt};
///
/// let error = EngineError::StoreUnavailable("disk I/O error".to_string());
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::Config("bad port".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Store errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    // Request errors
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    // State encoding errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Network errors
    #[error("Network error: {0}")]
    Network(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::StoreUnavailable(_) => "Session storage is unavailable. Please try again",
            Self::MalformedRequest(_) => "Failed to process request",
            Self::Serialization(_) => "Session data could not be read. It may be corrupted",
            Self::Network(_) => "Network operation failed. Check your connection",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::Serialization(_) => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
