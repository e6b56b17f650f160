//! Insight API - HTTP service for the analytics chatbot.
//!
//! This crate wires the conversation session engine to its HTTP surface:
//! - Session endpoints (create, get, delete)
//! - The query endpoint that drives the engine
//! - Health check and bearer-key authentication
//! - A background sweep that reaps expired sessions

#![warn(clippy::all)]

pub mod auth;
pub mod routes;

use axum::Router;
use insight_common::Config;
use insight_engine::analytics::FileReportProvider;
use insight_engine::backend::LlmBackend;
use insight_engine::engine::ChatEngine;
use insight_engine::provider;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

/// Build the API router with CORS middleware.
pub fn build_router(config: &Config, engine: Arc<ChatEngine>) -> anyhow::Result<Router> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Ok(routes::build_routes(config, engine)?.layer(cors))
}

/// Build the engine with its production collaborators.
pub fn build_engine(config: &Config) -> anyhow::Result<Arc<ChatEngine>> {
    let provider = provider::from_config(&config.llm)?;
    let backend = Arc::new(LlmBackend::new(provider));
    let reports = Arc::new(FileReportProvider::new(config.analytics.reports_dir.clone()));
    Ok(Arc::new(ChatEngine::new(backend, reports, config)))
}

/// Start the API server.
pub async fn start_server(config: &Config) -> anyhow::Result<()> {
    let engine = build_engine(config)?;
    let router = build_router(config, engine.clone())?;

    spawn_expiry_sweep(engine, Duration::from_secs(config.session.sweep_interval_secs));

    let addr = config.bind_address();
    tracing::info!("Starting Insight API on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

/// Periodically reap expired sessions.
///
/// Expired sessions are already invisible to every store operation; the
/// sweep just reclaims their memory, so its cadence is not correctness
/// sensitive.
fn spawn_expiry_sweep(engine: Arc<ChatEngine>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let reaped = engine.store().sweep_expired().await;
            if reaped > 0 {
                tracing::debug!(reaped, "Reaped expired sessions");
            }
        }
    });
}
