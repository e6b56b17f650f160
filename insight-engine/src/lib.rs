//! Insight Engine - the conversation session engine behind the analytics
//! chatbot.
//!
//! This crate provides:
//! - Session state types and the concurrency-safe, time-bounded store
//! - History compaction via LLM summarization
//! - The completion backend contract (routing, grounded answers, summaries)
//!   and its HTTP LLM implementation
//! - The analytics report provider
//! - The turn orchestrator (`ChatEngine`), the single public entry point

#![warn(clippy::all)]

pub mod analytics;
pub mod backend;
pub mod engine;
pub mod provider;
pub mod session;

pub use analytics::{AnalyticsCategory, FileReportProvider, ReportProvider};
pub use backend::{CompletionBackend, LlmBackend, RouteDecision};
pub use engine::ChatEngine;
pub use provider::Provider;
pub use session::{Role, Session, SessionStore, Turn};
