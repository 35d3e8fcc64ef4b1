//! HTTP front door
//!
//! Thin axum layer that forwards `{sessionId, message}` to the session engine
//! and relays `{response}` back.
//!
//! # Endpoints
//!
//! - GET / and /index.html - Embedded chat page
//! - POST /api/chat - `{message, sessionId}` → `{response}`
//! - POST /api/sessions/:id/chat - `{message}` → `{response}`
//! - GET /api/status - Server status

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use sdk::errors::{EngineError, EngineErrorExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::session::SessionEngine;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Body of every failed chat request
const FAILURE_MESSAGE: &str = "Failed to process request";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    message: String,
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionChatBody {
    message: String,
}

#[derive(Debug, Serialize)]
struct ChatReply {
    response: String,
}

#[derive(Clone)]
struct ApiState {
    engine: Arc<SessionEngine>,
}

/// Build the router with CORS and request tracing applied
pub fn router(engine: Arc<SessionEngine>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(index_handler))
        .route("/index.html", get(index_handler))
        .route("/api/chat", post(chat_handler))
        .route("/api/sessions/:id/chat", post(session_chat_handler))
        .route("/api/status", get(status_handler))
        .fallback(not_found_handler)
        .with_state(ApiState { engine })
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Bind `addr` and serve until Ctrl-C, then close the store
pub async fn serve(engine: Arc<SessionEngine>, addr: SocketAddr) -> Result<(), EngineError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| EngineError::Network(format!("Failed to bind to {}: {}", addr, e)))?;

    serve_with_shutdown(listener, engine, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves
pub async fn serve_with_shutdown(
    listener: tokio::net::TcpListener,
    engine: Arc<SessionEngine>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), EngineError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("Listening on http://{}", addr);
    }

    axum::serve(listener, router(Arc::clone(&engine)))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| EngineError::Network(format!("Server error: {}", e)))?;

    tracing::info!("Server stopped, closing session store");
    engine.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}

async fn index_handler() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn chat_handler(
    State(state): State<ApiState>,
    payload: Result<Json<ChatBody>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(body)) => run_turn(&state, &body.session_id, &body.message).await,
        Err(rejection) => failure_response(EngineError::MalformedRequest(rejection.body_text())),
    }
}

async fn session_chat_handler(
    State(state): State<ApiState>,
    Path(session_id): Path<String>,
    payload: Result<Json<SessionChatBody>, JsonRejection>,
) -> Response {
    match payload {
        Ok(Json(body)) => run_turn(&state, &session_id, &body.message).await,
        Err(rejection) => failure_response(EngineError::MalformedRequest(rejection.body_text())),
    }
}

async fn run_turn(state: &ApiState, session_id: &str, message: &str) -> Response {
    match state.engine.handle_turn(session_id, message).await {
        Ok(response) => Json(ChatReply { response }).into_response(),
        Err(e) => {
            tracing::error!(session = %session_id, "Turn failed: {}", e);
            failure_response(e.into())
        }
    }
}

async fn status_handler() -> Json<serde_json::Value> {
    Json(json!({
        "status": "running",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

async fn not_found_handler() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not Found")
}

/// Log the failure and answer with the generic 500 body
fn failure_response(err: EngineError) -> Response {
    tracing::warn!(
        hint = err.user_hint(),
        recoverable = err.is_recoverable(),
        "Request failed: {}",
        err
    );

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": FAILURE_MESSAGE })),
    )
        .into_response()
}
