//! Insight API - Main entry point.

use anyhow::Result;
use insight_common::config::Config;
use insight_common::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load_with_env()?;

    // Initialize logging
    init_logging(
        &config.observability.log_level,
        &config.observability.log_format,
    );

    tracing::info!("Insight API v{}", env!("CARGO_PKG_VERSION"));

    // Start the API server
    insight_api::start_server(&config).await
}
