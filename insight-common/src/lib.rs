//! Insight Common - Shared configuration, errors, and logging for the
//! Insight analytics chatbot services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - The unified error type and handling utilities
//! - Logging setup with noise filtering

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod logging;

pub use config::{
    AnalyticsConfig, AuthConfig, Config, LlmConfig, NetworkConfig, ObservabilityConfig,
    ServerConfig, SessionConfig,
};
pub use error::{Error, Result};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, SessionConfig};
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::logging::init_logging;
}
