//! Session state engine
//!
//! Owns the per-session state (bounded history, task list, free-form
//! context), classifies each inbound message, applies it and persists the
//! result.
//!
//! # Components
//!
//! - **ConversationLog**: bounded message history
//! - **TaskRegistry**: ordered tasks with active/completed partitioning
//! - **IntentRouter** (`intent`): keyword rule table
//! - **SessionEngine**: load → classify → apply → append → save, serialized per key

use serde::{Deserialize, Serialize};

pub mod conversation;
pub mod engine;
pub mod intent;
pub mod locks;
pub mod tasks;

// Re-export commonly used types
pub use conversation::ConversationLog;
pub use engine::{SessionEngine, TurnError, TurnPolicy};
pub use intent::{classify, Intent, Ordinal};
pub use locks::SessionLocks;
pub use tasks::{Task, TaskError, TaskRegistry};

/// Everything persisted for one session key
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SessionState {
    pub history: ConversationLog,
    pub tasks: TaskRegistry,
    /// Free-form session memory; opaque to the engine
    pub context: serde_json::Map<String, serde_json::Value>,
}

impl SessionState {
    /// Decode a stored blob
    pub fn from_blob(blob: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(blob)
    }

    /// Encode for the keyed store
    pub fn to_blob(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
