//! Command handlers for CLI operations
//!
//! - serve: run the HTTP front door
//! - chat: run one turn locally
//! - tasks / history: read-only views of one session
//! - sessions: list stored session keys
//! - doctor: validate configuration, store and provider

use anyhow::{Context, Result};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::config::Config;
use crate::llm::build_provider;
use crate::session::{SessionEngine, SessionState, TurnPolicy};
use crate::store::{open_store, KeyedStore};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

impl OutputFormat {
    pub fn from_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

/// Wire the configured store and provider into a session engine
pub async fn build_engine(config: &Config) -> Result<Arc<SessionEngine>> {
    let store = open_store(config)
        .await
        .context("Failed to open session store")?;
    let gateway = build_provider(&config.llm).context("Failed to initialize LLM provider")?;

    Ok(Arc::new(SessionEngine::new(
        store,
        gateway,
        TurnPolicy::from_config(config),
    )))
}

/// Run the HTTP server until Ctrl-C
pub async fn handle_serve(config: &Config, port: Option<u16>) -> Result<()> {
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", config.server.host, port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, port))?;

    let engine = build_engine(config).await?;
    crate::api::serve(engine, addr).await?;
    Ok(())
}

/// Send one message and print the reply
pub async fn handle_chat(
    config: &Config,
    session: &str,
    message: &str,
    format: OutputFormat,
) -> Result<()> {
    let engine = build_engine(config).await?;
    let response = engine.handle_turn(session, message).await;
    engine.close().await.context("Failed to close session store")?;
    let response = response.context("Failed to process message")?;

    match format {
        OutputFormat::Text => println!("{}", response),
        OutputFormat::Json => {
            let output = json!({
                "session": session,
                "response": response
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the session's formatted task list
pub async fn handle_tasks(config: &Config, session: &str, format: OutputFormat) -> Result<()> {
    let state = read_session(config, session).await?;

    match format {
        OutputFormat::Text => print!("{}", state.tasks.list_formatted()),
        OutputFormat::Json => {
            let output = json!({
                "session": session,
                "tasks": state.tasks,
                "active": state.tasks.active_count(),
                "completed": state.tasks.completed_count()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Print the session's retained conversation
pub async fn handle_history(config: &Config, session: &str, format: OutputFormat) -> Result<()> {
    let state = read_session(config, session).await?;

    match format {
        OutputFormat::Text => {
            if state.history.is_empty() {
                println!("No messages for session '{}'.", session);
                return Ok(());
            }

            println!("History for '{}' ({} messages):", session, state.history.len());
            println!();
            for message in state.history.messages() {
                println!("[{}] {}", message.role, message.content);
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "session": session,
                "messages": state.history,
                "count": state.history.len()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// List stored session keys
pub async fn handle_sessions(config: &Config, format: OutputFormat) -> Result<()> {
    let store = open_store(config)
        .await
        .context("Failed to open session store")?;
    let keys = store.list_keys().await.context("Failed to list sessions")?;
    store.close().await.context("Failed to close session store")?;

    match format {
        OutputFormat::Text => {
            if keys.is_empty() {
                println!("No sessions stored.");
            } else {
                println!("Sessions ({}):", keys.len());
                for key in &keys {
                    println!("  {}", key);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "sessions": keys,
                "count": keys.len()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Run system diagnostics
pub async fn handle_doctor(config: &Config, format: OutputFormat) -> Result<()> {
    let mut issues = Vec::new();
    let mut checks: Vec<(&str, String)> = Vec::new();

    // Config is already validated when loaded
    checks.push(("Configuration", "Valid".to_string()));

    if config.core.data_dir.exists() {
        checks.push(("Data directory", "Exists".to_string()));
    } else {
        checks.push(("Data directory", "Missing".to_string()));
        issues.push(format!(
            "Data directory does not exist: {}",
            config.core.data_dir.display()
        ));
    }

    match open_store(config).await {
        Ok(store) => {
            match store.list_keys().await {
                Ok(keys) => checks.push((
                    "Session store",
                    format!("OK ({}, {} sessions)", config.store.backend, keys.len()),
                )),
                Err(e) => {
                    checks.push(("Session store", "Query failed".to_string()));
                    issues.push(format!("Cannot read session store: {}", e));
                }
            }
            if let Err(e) = store.close().await {
                issues.push(format!("Cannot close session store: {}", e));
            }
        }
        Err(e) => {
            checks.push(("Session store", "Unavailable".to_string()));
            issues.push(format!("Cannot open session store: {}", e));
        }
    }

    match build_provider(&config.llm) {
        Ok(provider) => {
            if provider.check_health().await {
                checks.push(("LLM provider", format!("{} available", provider.name())));
            } else {
                checks.push(("LLM provider", format!("{} unreachable", provider.name())));
                issues.push(format!(
                    "LLM provider '{}' did not respond. Chat replies will fall back to an apology.",
                    provider.name()
                ));
            }
        }
        Err(e) => {
            checks.push(("LLM provider", "Not configured".to_string()));
            issues.push(format!("Cannot initialize LLM provider: {}", e));
        }
    }

    match format {
        OutputFormat::Text => {
            println!("Taskpal System Diagnostics");
            println!("============================");
            println!();

            println!("System Checks:");
            for (check, status) in &checks {
                println!("  {:<25} {}", format!("{}:", check), status);
            }

            println!();

            if issues.is_empty() {
                println!("✓ All checks passed!");
            } else {
                println!("⚠ Issues found:");
                println!();
                for (i, issue) in issues.iter().enumerate() {
                    println!("  {}. {}", i + 1, issue);
                }
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "checks": checks.iter().map(|(name, status)| {
                    json!({
                        "name": name,
                        "status": status
                    })
                }).collect::<Vec<_>>(),
                "issues": issues,
                "healthy": issues.is_empty()
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Load one session's state straight from the store, without a provider
async fn read_session(config: &Config, session: &str) -> Result<SessionState> {
    let store = open_store(config)
        .await
        .context("Failed to open session store")?;
    let state = load_state(store.as_ref(), session).await;
    store.close().await.context("Failed to close session store")?;
    state
}

async fn load_state(store: &dyn KeyedStore, session: &str) -> Result<SessionState> {
    match store.get(session).await? {
        Some(blob) => SessionState::from_blob(&blob)
            .with_context(|| format!("Stored state for session '{}' is corrupt", session)),
        None => Ok(SessionState::default()),
    }
}
