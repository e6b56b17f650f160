//! Configuration management for Insight services.
//!
//! Configuration is read from a JSON file (`insight.json` in the working
//! directory, or the path in `INSIGHT_CONFIG`) with environment-variable
//! overrides applied on top.
//!
//! # Configuration Priority
//!
//! 1. Environment variables (INSIGHT_* prefix, plus provider API keys)
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `INSIGHT_BIND_ADDRESS` → network.bind
//! - `INSIGHT_PORT` → server.port
//! - `INSIGHT_API_KEY` → auth.api_key
//! - `INSIGHT_LOG_LEVEL` → observability.log_level
//! - `INSIGHT_REPORTS_DIR` → analytics.reports_dir
//! - `ANTHROPIC_API_KEY` → llm.anthropic_api_key
//! - `OPENAI_API_KEY` → llm.openai_api_key

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    std::env::var("INSIGHT_CONFIG")
        .map_or_else(|_| PathBuf::from("insight.json"), PathBuf::from)
}

// ============================================================================
// Network Configuration
// ============================================================================

/// Global network configuration.
///
/// Controls the bind address for the API service. Default is `127.0.0.1`
/// (local only). Set to `0.0.0.0` to allow remote access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Bind address for the service.
    #[serde(default = "default_bind_address")]
    pub bind: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1".into()
}

// ============================================================================
// Server Configuration
// ============================================================================

/// API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port the HTTP API listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Per-request timeout applied by the HTTP layer, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_port() -> u16 {
    8000
}

fn default_request_timeout() -> u64 {
    120
}

fn default_body_limit() -> usize {
    64 * 1024
}

// ============================================================================
// Auth Configuration
// ============================================================================

/// Authentication configuration.
///
/// The API uses a single static bearer key shared with administrative
/// clients. A missing key is a startup error for the API binary.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Expected value of the `Authorization: Bearer` header.
    #[serde(default)]
    pub api_key: Option<String>,
}

// ============================================================================
// LLM Configuration
// ============================================================================

/// Completion backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider selection: "anthropic" or "openai".
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model identifier passed to the provider.
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// Override the provider's base URL (useful for proxies and tests).
    #[serde(default)]
    pub base_url: Option<String>,

    /// Sampling temperature for response generation.
    #[serde(default = "default_llm_temperature")]
    pub temperature: f64,

    /// Maximum tokens per completion.
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Timeout for a single classification call, in seconds.
    #[serde(default = "default_route_timeout")]
    pub route_timeout_secs: u64,

    /// Timeout for a single generation or summarization call, in seconds.
    #[serde(default = "default_generate_timeout")]
    pub generate_timeout_secs: u64,

    /// Anthropic API key (usually from `ANTHROPIC_API_KEY`).
    #[serde(default)]
    pub anthropic_api_key: Option<String>,

    /// OpenAI API key (usually from `OPENAI_API_KEY`).
    #[serde(default)]
    pub openai_api_key: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            base_url: None,
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            route_timeout_secs: default_route_timeout(),
            generate_timeout_secs: default_generate_timeout(),
            anthropic_api_key: None,
            openai_api_key: None,
        }
    }
}

fn default_llm_provider() -> String {
    "anthropic".into()
}

fn default_llm_model() -> String {
    "claude-3-5-sonnet-20241022".into()
}

fn default_llm_temperature() -> f64 {
    0.3
}

fn default_llm_max_tokens() -> u32 {
    1024
}

fn default_route_timeout() -> u64 {
    15
}

fn default_generate_timeout() -> u64 {
    45
}

// ============================================================================
// Session Configuration
// ============================================================================

/// Session engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Absolute session lifetime in seconds, measured from creation.
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// Turn count above which history is compacted.
    #[serde(default = "default_compact_threshold")]
    pub compact_threshold: usize,

    /// Number of recent turns kept verbatim after compaction.
    #[serde(default = "default_keep_recent")]
    pub keep_recent: usize,

    /// Interval between expired-session sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Commit attempts per turn before giving up with a transient error.
    #[serde(default = "default_commit_attempts")]
    pub commit_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            compact_threshold: default_compact_threshold(),
            keep_recent: default_keep_recent(),
            sweep_interval_secs: default_sweep_interval(),
            commit_attempts: default_commit_attempts(),
        }
    }
}

fn default_session_ttl() -> u64 {
    4 * 60 * 60
}

fn default_compact_threshold() -> usize {
    20
}

fn default_keep_recent() -> usize {
    8
}

fn default_sweep_interval() -> u64 {
    300
}

fn default_commit_attempts() -> u32 {
    3
}

// ============================================================================
// Analytics Configuration
// ============================================================================

/// Analytics report provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Directory holding the pre-aggregated category reports.
    #[serde(default = "default_reports_dir")]
    pub reports_dir: PathBuf,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            reports_dir: default_reports_dir(),
        }
    }
}

fn default_reports_dir() -> PathBuf {
    PathBuf::from("analytics_reports")
}

// ============================================================================
// Observability Configuration
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Base log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log output format: "pretty" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration for Insight services.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub analytics: AnalyticsConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    ///
    /// A missing config file is not an error; defaults are used.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("INSIGHT_BIND_ADDRESS") {
            self.network.bind = bind;
        }
        if let Ok(port) = std::env::var("INSIGHT_PORT") {
            if let Ok(p) = port.parse() {
                self.server.port = p;
            }
        }
        if let Ok(key) = std::env::var("INSIGHT_API_KEY") {
            self.auth.api_key = Some(key);
        }
        if let Ok(level) = std::env::var("INSIGHT_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Ok(dir) = std::env::var("INSIGHT_REPORTS_DIR") {
            self.analytics.reports_dir = PathBuf::from(dir);
        }

        // Provider API key fallbacks
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            self.llm.anthropic_api_key = Some(key);
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.llm.openai_api_key = Some(key);
        }
    }

    /// Socket address the API server binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.network.bind, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.network.bind, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.session.ttl_secs, 4 * 60 * 60);
        assert_eq!(config.session.compact_threshold, 20);
        assert!(config.session.keep_recent < config.session.compact_threshold);
        assert_eq!(config.analytics.reports_dir, PathBuf::from("analytics_reports"));
        assert!(config.auth.api_key.is_none());
    }

    #[test]
    fn bind_address_joins_host_and_port() {
        let config = Config::default();
        assert_eq!(config.bind_address(), "127.0.0.1:8000");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let json = r#"{ "server": { "port": 9001 }, "auth": { "api_key": "secret" } }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.server.port, 9001);
        assert_eq!(config.auth.api_key.as_deref(), Some("secret"));
        // Untouched sections fall back to defaults
        assert_eq!(config.session.compact_threshold, 20);
        assert_eq!(config.llm.provider, "anthropic");
    }

    #[test]
    fn load_from_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insight.json");
        fs::write(&path, r#"{ "observability": { "log_format": "json" } }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.observability.log_format, "json");
    }

    #[test]
    fn load_from_rejects_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insight.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(Config::load_from(&path).is_err());
    }
}
