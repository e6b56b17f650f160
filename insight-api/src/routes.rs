//! Route definitions for the Insight API.
//!
//! Provides HTTP endpoints for session management, query processing, and
//! health checks. All endpoints except health require the administrative
//! API key.

use crate::auth::{require_api_key, session_id_from_headers, AuthState};
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use insight_common::{Config, Error};
use insight_engine::engine::ChatEngine;
use insight_engine::session::{Session, Turn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ChatEngine>,
}

/// Query request body.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The administrator's message to the chatbot
    pub message: String,
}

/// Query response.
#[derive(Debug, Serialize, Deserialize)]
pub struct QueryResponse {
    /// The chatbot's reply
    pub response: String,
    /// Session the query ran against
    pub session_id: String,
    /// When the response was generated
    pub timestamp: DateTime<Utc>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Conversation state as exposed to API clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionState {
    /// Conversation history in order
    pub messages: Vec<Turn>,
    /// Condensed earlier history, present once compaction has run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl From<Session> for SessionState {
    fn from(session: Session) -> Self {
        Self {
            messages: session.messages,
            summary: session.summary,
        }
    }
}

/// Session create/get response.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub state: SessionState,
}

/// Session deletion response.
#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteSessionResponse {
    pub deleted: bool,
    pub session_id: String,
    pub timestamp: DateTime<Utc>,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service: String,
    pub timestamp: DateTime<Utc>,
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

/// Render an engine error as an HTTP response.
pub fn error_response(err: &Error) -> Response {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorResponse {
        error: err.to_string(),
        code: err.code().to_string(),
    };
    (status, Json(body)).into_response()
}

/// Build the complete router with all routes.
///
/// Fails when no API key is configured; the service must never come up
/// unauthenticated.
pub fn build_routes(config: &Config, engine: Arc<ChatEngine>) -> anyhow::Result<Router> {
    let api_key = config
        .auth
        .api_key
        .clone()
        .ok_or_else(|| anyhow::anyhow!("auth.api_key is not configured (set INSIGHT_API_KEY)"))?;

    let auth_state = AuthState::new(api_key);
    let app_state = AppState { engine };

    let protected = Router::new()
        .route("/api/sessions", post(create_session_handler))
        .route(
            "/api/sessions/:id",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/api/query", post(query_handler))
        .layer(middleware::from_fn_with_state(auth_state, require_api_key))
        .with_state(app_state);

    let router = Router::new()
        .route("/api/health", get(health_handler))
        .merge(protected)
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )))
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes));

    Ok(router)
}

/// Health check; no authentication so monitors can reach it.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        version: env!("CARGO_PKG_VERSION").into(),
        service: "insight-api".into(),
        timestamp: Utc::now(),
    })
}

/// Create a new chatbot session.
async fn create_session_handler(State(state): State<AppState>) -> Response {
    let session = state.engine.create_session().await;
    let body = SessionResponse {
        session_id: session.id.clone(),
        state: session.into(),
    };
    (StatusCode::CREATED, Json(body)).into_response()
}

/// Retrieve the current state of a session.
async fn get_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.get_session(&id).await {
        Ok(session) => Json(SessionResponse {
            session_id: session.id.clone(),
            state: session.into(),
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

/// Delete a session and clear its state.
async fn delete_session_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Response {
    match state.engine.delete_session(&id).await {
        Ok(()) => Json(DeleteSessionResponse {
            deleted: true,
            session_id: id,
            timestamp: Utc::now(),
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}

/// Process an administrator query against a session.
async fn query_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<QueryRequest>,
) -> Response {
    let started = Instant::now();

    let session_id = match session_id_from_headers(&headers) {
        Ok(id) => id,
        Err(err) => return error_response(&err),
    };

    match state.engine.submit_message(&session_id, &request.message).await {
        Ok(turn) => Json(QueryResponse {
            response: turn.content,
            session_id,
            timestamp: Utc::now(),
            processing_time_ms: started.elapsed().as_millis() as u64,
        })
        .into_response(),
        Err(err) => error_response(&err),
    }
}
