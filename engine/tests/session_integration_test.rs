//! Integration tests for the session engine
//!
//! Turns run against an in-memory store and a scripted provider, so no
//! network or disk access is needed.

mod common;

use common::{memory_engine, memory_engine_with, policy, ReadOnlyStore, ScriptedProvider};
use std::collections::HashSet;
use std::sync::Arc;
use taskpal_engine::llm::{LLMProvider, MessageRole};
use taskpal_engine::session::engine::GATEWAY_FAILURE_REPLY;
use taskpal_engine::session::{SessionEngine, TurnError};
use taskpal_engine::store::{KeyedStore, StoreError};

#[tokio::test]
async fn test_add_then_list() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, _store) = memory_engine(&provider);

    let reply = engine.handle_turn("alice", "Add task: Buy milk").await.unwrap();
    assert_eq!(reply, "✅ Task added: \"Buy milk\"");

    let reply = engine.handle_turn("alice", "what tasks do I have").await.unwrap();
    assert_eq!(reply, "📋 Your Tasks:\n\nActive:\n1. Buy milk\n");

    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_ordinals_follow_current_active_list() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, _store) = memory_engine(&provider);

    engine.handle_turn("s", "add task: A").await.unwrap();
    engine.handle_turn("s", "add task: B").await.unwrap();

    let reply = engine.handle_turn("s", "delete task 1").await.unwrap();
    assert_eq!(reply, "🗑️ Deleted: \"A\"");

    let reply = engine.handle_turn("s", "complete task 1").await.unwrap();
    assert_eq!(reply, "✓ Completed: \"B\"");

    let state = engine.snapshot("s").await.unwrap();
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks.completed_count(), 1);
}

#[tokio::test]
async fn test_blank_add_title_asks_for_usage() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, _store) = memory_engine(&provider);

    engine.handle_turn("s", "add task: Water plants").await.unwrap();

    for message in ["add task: ", "add task:   "] {
        let reply = engine.handle_turn("s", message).await.unwrap();
        assert_eq!(
            reply,
            "I'd be happy to add a task! Please tell me what the task is. For example: 'Add task: Buy groceries'"
        );
    }

    let state = engine.snapshot("s").await.unwrap();
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_complete_with_no_tasks() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, _store) = memory_engine(&provider);

    let reply = engine.handle_turn("empty", "complete task 1").await.unwrap();
    assert_eq!(reply, "Task 1 not found. You have 0 active tasks.");

    // The exchange is still recorded
    let state = engine.snapshot("empty").await.unwrap();
    assert_eq!(state.history.len(), 2);
}

#[tokio::test]
async fn test_chat_fallback_request_shape() {
    let provider = ScriptedProvider::replying("Sunny with a chance of tasks.");
    let (engine, _store) = memory_engine(&provider);

    engine.handle_turn("s", "add task: one").await.unwrap();
    engine.handle_turn("s", "add task: two").await.unwrap();
    engine.handle_turn("s", "complete task 1").await.unwrap();

    let reply = engine.handle_turn("s", "How is the weather?").await.unwrap();
    assert_eq!(reply, "Sunny with a chance of tasks.");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];

    assert_eq!(request.model, "test-model");
    assert_eq!(request.max_tokens, 128);
    assert_eq!(request.temperature, 0.5);

    // system + 4 prior messages + current user message
    assert_eq!(request.messages.len(), 6);

    let system = &request.messages[0];
    assert_eq!(system.role, MessageRole::System);
    assert!(system.content.contains("- Active tasks: 1"));
    assert!(system.content.contains("- Completed tasks: 1"));

    assert_eq!(request.messages[1].content, "add task: two");
    assert_eq!(request.messages[2].content, "✅ Task added: \"two\"");
    assert_eq!(request.messages[3].content, "complete task 1");
    assert_eq!(request.messages[4].content, "✓ Completed: \"one\"");

    let last = &request.messages[5];
    assert_eq!(last.role, MessageRole::User);
    assert_eq!(last.content, "How is the weather?");
}

#[tokio::test]
async fn test_first_chat_has_no_prior_context() {
    let provider = ScriptedProvider::replying("Hello!");
    let (engine, _store) = memory_engine(&provider);

    engine.handle_turn("new", "hi there").await.unwrap();

    let request = &provider.requests()[0];
    assert_eq!(request.messages.len(), 2);
    assert_eq!(request.messages[1].content, "hi there");
}

#[tokio::test]
async fn test_gateway_failure_is_persisted_as_apology() {
    let provider = ScriptedProvider::failing();
    let (engine, _store) = memory_engine(&provider);

    let reply = engine.handle_turn("s", "tell me a joke").await.unwrap();
    assert_eq!(reply, GATEWAY_FAILURE_REPLY);

    let state = engine.snapshot("s").await.unwrap();
    let messages = state.history.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content, "tell me a joke");
    assert_eq!(messages[1].role, MessageRole::Assistant);
    assert_eq!(messages[1].content, GATEWAY_FAILURE_REPLY);
}

#[tokio::test]
async fn test_history_trimmed_to_limit() {
    let provider = ScriptedProvider::replying("ok");
    let (engine, _store) = memory_engine(&provider);

    for i in 0..6 {
        engine.handle_turn("s", &format!("message {}", i)).await.unwrap();
    }

    let state = engine.snapshot("s").await.unwrap();
    let messages = state.history.messages();
    assert_eq!(messages.len(), 10);
    assert_eq!(messages[0].content, "message 1");
    assert_eq!(messages[9].role, MessageRole::Assistant);
}

#[tokio::test]
async fn test_custom_context_window() {
    let provider = ScriptedProvider::replying("ok");
    let (engine, _store) = memory_engine_with(&provider, policy(6, 2));

    for i in 0..4 {
        engine.handle_turn("s", &format!("m{}", i)).await.unwrap();
    }

    let last = provider.requests().pop().unwrap();
    // system + 2 prior + current
    assert_eq!(last.messages.len(), 4);
    assert_eq!(last.messages[1].content, "m2");
    assert_eq!(last.messages[2].content, "ok");

    assert_eq!(engine.snapshot("s").await.unwrap().history.len(), 6);
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, store) = memory_engine(&provider);

    engine.handle_turn("alice", "add task: alice's task").await.unwrap();

    let reply = engine.handle_turn("bob", "list tasks").await.unwrap();
    assert_eq!(
        reply,
        "You don't have any tasks yet. Try adding one by saying 'Add task: Your task description'"
    );

    assert_eq!(
        store.list_keys().await.unwrap(),
        vec!["alice".to_string(), "bob".to_string()]
    );
}

#[tokio::test]
async fn test_snapshot_does_not_create_session() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, store) = memory_engine(&provider);

    let state = engine.snapshot("ghost").await.unwrap();
    assert!(state.history.is_empty());
    assert!(state.tasks.is_empty());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_corrupt_state_fails_turn() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, store) = memory_engine(&provider);

    store.put("broken", b"[1, 2".to_vec()).await.unwrap();

    let err = engine.handle_turn("broken", "list tasks").await.unwrap_err();
    assert!(matches!(err, TurnError::Store(StoreError::Corrupt { .. })));

    // Nothing was overwritten
    assert_eq!(store.get("broken").await.unwrap().unwrap(), b"[1, 2");
}

#[tokio::test]
async fn test_store_write_failure_fails_turn() {
    let store: Arc<dyn KeyedStore> = Arc::new(ReadOnlyStore::default());
    let gateway: Arc<dyn LLMProvider> = ScriptedProvider::replying("unused");
    let engine = SessionEngine::new(store, gateway, policy(10, 4));

    let err = engine.handle_turn("s", "add task: x").await.unwrap_err();
    assert!(matches!(err, TurnError::Store(StoreError::Backend(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_turns_on_one_session_lose_nothing() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, _store) = memory_engine_with(&provider, policy(100, 4));
    let engine = Arc::new(engine);

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                engine
                    .handle_turn("shared", &format!("add task: item {}", i))
                    .await
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap();
    }

    let state = engine.snapshot("shared").await.unwrap();
    assert_eq!(state.tasks.len(), 25);
    assert_eq!(state.history.len(), 50);

    let ids: HashSet<_> = state.tasks.iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids.len(), 25);

    // Each user message is immediately followed by its own reply
    for pair in state.history.messages().chunks(2) {
        assert_eq!(pair[0].role, MessageRole::User);
        let title = pair[0].content.trim_start_matches("add task: ");
        assert_eq!(pair[1].content, format!("✅ Task added: \"{}\"", title));
    }
}

#[tokio::test]
async fn test_session_keys_listed() {
    let provider = ScriptedProvider::replying("unused");
    let (engine, _store) = memory_engine(&provider);

    engine.handle_turn("b", "list tasks").await.unwrap();
    engine.handle_turn("a", "list tasks").await.unwrap();

    assert_eq!(
        engine.session_keys().await.unwrap(),
        vec!["a".to_string(), "b".to_string()]
    );
}
