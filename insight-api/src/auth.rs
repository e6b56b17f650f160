//! Authentication for the Insight API.
//!
//! Every endpoint except the health check requires the shared
//! administrative API key as a bearer token. Query requests additionally
//! carry their conversation scope in the `X-Session-ID` header; session ids
//! are unguessable and double as the only access-control scope for
//! conversation state.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use insight_common::{Error, Result};
use std::sync::Arc;

use crate::routes::error_response;

/// Header carrying the conversation scope for query requests.
pub const SESSION_HEADER: &str = "x-session-id";

/// Authentication state shared across requests.
#[derive(Clone)]
pub struct AuthState {
    api_key: Arc<String>,
}

impl AuthState {
    /// Create auth state around the expected API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Arc::new(api_key.into()),
        }
    }

    /// Check a presented bearer token against the expected key.
    pub fn verify(&self, token: &str) -> Result<()> {
        if token == self.api_key.as_str() {
            Ok(())
        } else {
            Err(Error::Forbidden("Invalid API key".into()))
        }
    }
}

/// Authentication middleware.
pub async fn require_api_key(
    State(auth): State<AuthState>,
    request: Request,
    next: Next,
) -> std::result::Result<Response, Response> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| {
            error_response(&Error::Auth("Missing bearer credentials".into()))
        })?;

    auth.verify(token).map_err(|err| error_response(&err))?;

    Ok(next.run(request).await)
}

/// Extract the session id from the `X-Session-ID` header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Result<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| Error::InvalidInput("Missing X-Session-ID header".into()))
}
