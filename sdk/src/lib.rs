//! Taskpal SDK
//!
//! Shared library providing the error taxonomy used by the engine, its HTTP
//! front door and the command-line handlers.

/// Error types and handling
pub mod errors;

// Re-export commonly used types
pub use errors::{EngineError, EngineErrorExt};
