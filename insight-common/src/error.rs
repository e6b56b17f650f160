//! Error types for the Insight services.

use thiserror::Error;

/// Result type alias using the Insight error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Insight services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Authorization error
    #[error("Authorization error: {0}")]
    Forbidden(String),

    /// Session unknown, expired, or deleted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Concurrent mutation detected by the session store
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid input or request
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Completion backend returned an unusable classification
    #[error("Routing failure: {0}")]
    Routing(String),

    /// Completion backend failed to produce a reply
    #[error("Generation failure: {0}")]
    Generation(String),

    /// Analytics report missing or stale
    #[error("Data unavailable: {0}")]
    Unavailable(String),

    /// Retry budget exhausted, caller may try again
    #[error("Transient failure: {0}")]
    Transient(String),

    /// Operation timed out
    #[error("Operation timed out")]
    Timeout,

    /// External service error
    #[error("External service error: {0}")]
    External(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create an error with additional context.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Check if this is a not-found error.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this is a store conflict.
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Check if the caller may retry the operation.
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_) | Self::Timeout)
    }

    /// Get HTTP status code for this error.
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::Auth(_) => 401,
            Self::Forbidden(_) => 403,
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::InvalidInput(_) => 400,
            Self::Transient(_) => 503,
            Self::Timeout => 408,
            Self::WithContext { source, .. } => source.status_code(),
            _ => 500,
        }
    }

    /// Machine-readable error code for API responses.
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::Auth(_) => "auth",
            Self::Forbidden(_) => "forbidden",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::InvalidInput(_) => "invalid_input",
            Self::Routing(_) => "routing_failure",
            Self::Generation(_) => "generation_failure",
            Self::Unavailable(_) => "data_unavailable",
            Self::Transient(_) => "transient",
            Self::Timeout => "timeout",
            Self::External(_) => "external",
            Self::Internal(_) | Self::Io(_) | Self::Json(_) => "internal",
            Self::WithContext { source, .. } => source.code(),
        }
    }
}

/// Extension trait for adding context to any error type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(Error::Auth("test".into()).status_code(), 401);
        assert_eq!(Error::Forbidden("test".into()).status_code(), 403);
        assert_eq!(Error::NotFound("test".into()).status_code(), 404);
        assert_eq!(Error::Conflict("test".into()).status_code(), 409);
        assert_eq!(Error::InvalidInput("test".into()).status_code(), 400);
        assert_eq!(Error::Transient("test".into()).status_code(), 503);
        assert_eq!(Error::Internal("test".into()).status_code(), 500);
        assert_eq!(Error::Routing("test".into()).status_code(), 500);
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(Error::NotFound("s".into()).code(), "not_found");
        assert_eq!(Error::Routing("bad json".into()).code(), "routing_failure");
        assert_eq!(Error::Unavailable("stale".into()).code(), "data_unavailable");
    }

    #[test]
    fn test_error_with_context() {
        let err = Error::Conflict("version mismatch".into());
        let with_ctx = err.with_context("committing session");
        assert!(matches!(with_ctx, Error::WithContext { .. }));
        assert_eq!(with_ctx.status_code(), 409);
        assert_eq!(with_ctx.code(), "conflict");
    }

    #[test]
    fn test_transient_predicate() {
        assert!(Error::Transient("retry".into()).is_transient());
        assert!(Error::Timeout.is_transient());
        assert!(!Error::NotFound("s".into()).is_transient());
    }
}
