//! Session engine
//!
//! Runs one turn per inbound message:
//!
//! 1. Load the session's state from the keyed store (zero value when absent)
//! 2. Append the user message
//! 3. Classify and apply (task mutation or chat delegation)
//! 4. Append the reply
//! 5. Trim history to the configured bound
//! 6. Persist the full state
//! 7. Return the reply
//!
//! Steps 1-6 run under the session's lock, so concurrent turns on one key are
//! serialized in arrival order.

use sdk::errors::EngineError;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, info_span, Instrument};

use super::intent::{self, Intent, Ordinal};
use super::locks::SessionLocks;
use super::tasks::{TaskError, TaskRegistry};
use super::SessionState;
use crate::config::Config;
use crate::llm::{ChatRequest, LLMProvider, Message};
use crate::store::{KeyedStore, StoreError};

/// Reply used whenever the gateway call fails
pub const GATEWAY_FAILURE_REPLY: &str =
    "I'm having trouble processing that right now. Please try again.";

const ADD_USAGE_REPLY: &str = "I'd be happy to add a task! Please tell me what the task is. For example: 'Add task: Buy groceries'";
const COMPLETE_USAGE_REPLY: &str =
    "Please specify which task to complete by number. For example: 'Complete task 1'";
const DELETE_USAGE_REPLY: &str =
    "Please specify which task to delete by number. For example: 'Delete task 1'";

/// Errors that fail a whole turn
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode session state: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<TurnError> for EngineError {
    fn from(err: TurnError) -> Self {
        match err {
            TurnError::Store(e) => e.into(),
            TurnError::Serialization(e) => EngineError::Serialization(e.to_string()),
        }
    }
}

/// Per-turn limits and gateway parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TurnPolicy {
    /// Messages kept after every turn
    pub history_limit: usize,
    /// Prior messages sent with a chat request
    pub context_window: usize,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl TurnPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_limit: config.session.history_limit,
            context_window: config.session.context_window,
            model: config.llm.active_model().to_string(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
        }
    }
}

impl Default for TurnPolicy {
    fn default() -> Self {
        Self::from_config(&Config::default_config())
    }
}

pub struct SessionEngine {
    store: Arc<dyn KeyedStore>,
    gateway: Arc<dyn LLMProvider>,
    policy: TurnPolicy,
    locks: SessionLocks,
}

impl SessionEngine {
    pub fn new(
        store: Arc<dyn KeyedStore>,
        gateway: Arc<dyn LLMProvider>,
        policy: TurnPolicy,
    ) -> Self {
        Self {
            store,
            gateway,
            policy,
            locks: SessionLocks::new(),
        }
    }

    /// Process one message for `session_key` and return the reply
    ///
    /// Store failures fail the turn; nothing is persisted in that case. Task
    /// lookup problems and gateway failures are answered in the reply text.
    pub async fn handle_turn(&self, session_key: &str, message: &str) -> Result<String, TurnError> {
        let span = info_span!("turn", session = %session_key);

        async move {
            let started = Instant::now();
            let _guard = self.locks.acquire(session_key).await;

            let state = self.load(session_key).await?;
            let (state, reply) = self.run_turn(state, message).await;
            self.save(session_key, &state).await?;

            info!(
                history = state.history.len(),
                tasks = state.tasks.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Turn completed"
            );
            Ok(reply)
        }
        .instrument(span)
        .await
    }

    /// Current state of a session without mutating it
    pub async fn snapshot(&self, session_key: &str) -> Result<SessionState, TurnError> {
        let _guard = self.locks.acquire(session_key).await;
        self.load(session_key).await
    }

    /// Keys of every stored session
    pub async fn session_keys(&self) -> Result<Vec<String>, TurnError> {
        Ok(self.store.list_keys().await?)
    }

    /// Release the store; call once during shutdown
    pub async fn close(&self) -> Result<(), TurnError> {
        Ok(self.store.close().await?)
    }

    async fn run_turn(&self, mut state: SessionState, message: &str) -> (SessionState, String) {
        state.history.append(Message::user(message));

        let intent = intent::classify(message);
        debug!(intent = intent.kind(), "Message classified");

        let reply = match apply_task_intent(&mut state.tasks, &intent) {
            Some(reply) => reply,
            None => self.chat_reply(&state, message).await,
        };

        state.history.append(Message::assistant(reply.clone()));
        state.history.truncate_to_last(self.policy.history_limit);

        (state, reply)
    }

    async fn chat_reply(&self, state: &SessionState, message: &str) -> String {
        let mut messages = Vec::with_capacity(self.policy.context_window + 2);
        messages.push(Message::system(system_prompt(&state.tasks)));
        messages.extend_from_slice(state.history.recent_context(self.policy.context_window));
        messages.push(Message::user(message));

        let request = ChatRequest::new(
            self.policy.model.clone(),
            messages,
            self.policy.max_tokens,
            self.policy.temperature,
        );

        match self.gateway.complete(&request).await {
            Ok(text) => text,
            Err(e) => {
                error!(provider = self.gateway.name(), error = %e, "LLM gateway call failed");
                GATEWAY_FAILURE_REPLY.to_string()
            }
        }
    }

    async fn load(&self, session_key: &str) -> Result<SessionState, TurnError> {
        let started = Instant::now();
        let blob = self.store.get(session_key).await?;

        let state = match blob {
            None => {
                debug!("No stored state, starting fresh");
                SessionState::default()
            }
            Some(bytes) => {
                SessionState::from_blob(&bytes).map_err(|e| StoreError::Corrupt {
                    key: session_key.to_string(),
                    reason: e.to_string(),
                })?
            }
        };

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Session state loaded"
        );
        Ok(state)
    }

    async fn save(&self, session_key: &str, state: &SessionState) -> Result<(), TurnError> {
        let blob = state.to_blob()?;
        self.store.put(session_key, blob).await.map_err(|e| {
            error!(error = %e, "Failed to persist session state");
            TurnError::from(e)
        })
    }
}

/// Apply a task intent and produce its reply; `None` for chat
pub fn apply_task_intent(tasks: &mut TaskRegistry, intent: &Intent) -> Option<String> {
    let reply = match intent {
        Intent::AddTask(None) => ADD_USAGE_REPLY.to_string(),
        Intent::AddTask(Some(title)) => {
            let task = tasks.add(title.as_str());
            info!(task_id = %task.id, "Task added");
            format!("✅ Task added: \"{}\"", task.title)
        }
        Intent::ListTasks => tasks.list_formatted(),
        Intent::CompleteTask(None) => COMPLETE_USAGE_REPLY.to_string(),
        Intent::CompleteTask(Some(ordinal)) => {
            match resolve(ordinal, tasks, |tasks, n| tasks.complete_by_ordinal(n).cloned()) {
                Ok(task) => {
                    info!(task_id = %task.id, "Task completed");
                    format!("✓ Completed: \"{}\"", task.title)
                }
                Err(reply) => reply,
            }
        }
        Intent::DeleteTask(None) => DELETE_USAGE_REPLY.to_string(),
        Intent::DeleteTask(Some(ordinal)) => {
            match resolve(ordinal, tasks, |tasks, n| tasks.delete_by_ordinal(n)) {
                Ok(task) => {
                    info!(task_id = %task.id, "Task deleted");
                    format!("🗑️ Deleted: \"{}\"", task.title)
                }
                Err(reply) => reply,
            }
        }
        Intent::Chat => return None,
    };

    Some(reply)
}

/// Run an ordinal operation, turning lookup failures into reply text
fn resolve<T>(
    ordinal: &Ordinal,
    tasks: &mut TaskRegistry,
    op: impl FnOnce(&mut TaskRegistry, usize) -> Result<T, TaskError>,
) -> Result<T, String> {
    let not_found = |active: usize| format!("Task {} not found. You have {} active tasks.", ordinal, active);

    let Some(n) = ordinal.value() else {
        return Err(not_found(tasks.active_count()));
    };

    op(tasks, n).map_err(|TaskError::NotFound { active, .. }| {
        debug!(requested = n, active, "Task ordinal out of range");
        not_found(active)
    })
}

/// System prompt for chat fallback
pub fn system_prompt(tasks: &TaskRegistry) -> String {
    format!(
        "You are a helpful AI task assistant. You help users manage their tasks and remember information.

Current state:
- Active tasks: {}
- Completed tasks: {}

Capabilities:
- Add tasks: \"add task: description\"
- List tasks: \"show tasks\" or \"what tasks do I have\"
- Complete tasks: \"complete task 1\"
- Delete tasks: \"delete task 1\"
- General conversation and questions

Keep responses concise, friendly, and helpful. Remember context from previous messages.",
        tasks.active_count(),
        tasks.completed_count()
    )
}
