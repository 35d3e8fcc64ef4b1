//! Shared fixtures for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use taskpal_engine::llm::{ChatRequest, LLMError, LLMProvider};
use taskpal_engine::session::{SessionEngine, TurnPolicy};
use taskpal_engine::store::{KeyedStore, MemoryStore, StoreError};

/// Provider that records every request and answers with a fixed reply,
/// or fails every call when built with `failing()`
pub struct ScriptedProvider {
    reply: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedProvider {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LLMError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Some(text) => Ok(text.clone()),
            None => Err(LLMError::ProviderUnavailable("scripted outage".to_string())),
        }
    }
}

/// Store whose reads succeed but every write fails
#[derive(Default)]
pub struct ReadOnlyStore {
    inner: MemoryStore,
}

#[async_trait]
impl KeyedStore for ReadOnlyStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, _key: &str, _blob: Vec<u8>) -> Result<(), StoreError> {
        Err(StoreError::Backend("disk full".to_string()))
    }

    async fn list_keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_keys().await
    }
}

pub fn policy(history_limit: usize, context_window: usize) -> TurnPolicy {
    TurnPolicy {
        history_limit,
        context_window,
        model: "test-model".to_string(),
        max_tokens: 128,
        temperature: 0.5,
    }
}

/// Engine over a fresh in-memory store with the default 10/4 policy
pub fn memory_engine(provider: &Arc<ScriptedProvider>) -> (SessionEngine, Arc<MemoryStore>) {
    memory_engine_with(provider, policy(10, 4))
}

pub fn memory_engine_with(
    provider: &Arc<ScriptedProvider>,
    policy: TurnPolicy,
) -> (SessionEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let store_handle: Arc<dyn KeyedStore> = store.clone();
    let gateway: Arc<dyn LLMProvider> = provider.clone();
    (SessionEngine::new(store_handle, gateway, policy), store)
}
