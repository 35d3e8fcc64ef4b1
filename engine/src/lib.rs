//! Taskpal Engine Library
//!
//! Conversational task assistant: per-session state, intent routing, LLM
//! gateways and an HTTP front door. Used by the `taskpal` binary and the
//! integration tests.

/// Configuration management module
pub mod config;

/// Telemetry and Observability
pub mod telemetry;

/// LLM provider abstraction layer
pub mod llm;

/// Keyed blob persistence
pub mod store;

/// Per-session state engine
pub mod session;

/// HTTP front door
pub mod api;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
