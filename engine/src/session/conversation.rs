//! Bounded conversation history for one session

use serde::{Deserialize, Serialize};

use crate::llm::Message;

/// Append-only message log, trimmed from the front
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct ConversationLog {
    messages: Vec<Message>,
}

impl ConversationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Keep only the final `n` entries, dropping the oldest first
    pub fn truncate_to_last(&mut self, n: usize) {
        if self.messages.len() > n {
            let excess = self.messages.len() - n;
            self.messages.drain(..excess);
        }
    }

    /// Up to `n` entries that precede the most recent one.
    ///
    /// During a turn the most recent entry is the user message being
    /// answered, so this is the prior-turns window handed to the gateway.
    pub fn recent_context(&self, n: usize) -> &[Message] {
        let prior = match self.messages.split_last() {
            Some((_, prior)) => prior,
            None => return &[],
        };
        let start = prior.len().saturating_sub(n);
        &prior[start..]
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
