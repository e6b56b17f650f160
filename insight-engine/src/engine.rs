//! Turn orchestration.
//!
//! `ChatEngine` is the engine's single public entry point. Each submitted
//! message runs one cycle: load session, append the user turn, classify,
//! fetch grounding data when routed to analytics, generate the reply,
//! compact if due, and commit. The session store is written exactly once
//! per cycle, at the end, or not at all; a commit conflict restarts the
//! cycle from the load step.

use crate::analytics::ReportProvider;
use crate::backend::{CompletionBackend, RouteDecision};
use crate::session::{Compactor, Session, SessionStore, Turn};
use insight_common::{Config, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

/// Canned reply used when classification or generation fails; the
/// administrator's message is still recorded.
const FALLBACK_REPLY: &str = "I'm having trouble processing your request right now. \
Please try rephrasing your question or try again later.";

/// Conversation session engine.
pub struct ChatEngine {
    store: Arc<SessionStore>,
    backend: Arc<dyn CompletionBackend>,
    reports: Arc<dyn ReportProvider>,
    compactor: Compactor,
    route_timeout: Duration,
    generate_timeout: Duration,
    commit_attempts: u32,
}

impl ChatEngine {
    /// Build an engine from configuration and injected collaborators.
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        reports: Arc<dyn ReportProvider>,
        config: &Config,
    ) -> Self {
        let session = &config.session;
        Self {
            store: Arc::new(SessionStore::new(Duration::from_secs(session.ttl_secs))),
            backend: backend.clone(),
            reports,
            compactor: Compactor::new(backend, session.compact_threshold, session.keep_recent),
            route_timeout: Duration::from_secs(config.llm.route_timeout_secs),
            generate_timeout: Duration::from_secs(config.llm.generate_timeout_secs),
            commit_attempts: session.commit_attempts.max(1),
        }
    }

    /// The underlying session store (used by the expiry sweep task).
    pub fn store(&self) -> Arc<SessionStore> {
        self.store.clone()
    }

    /// Create a new empty session.
    pub async fn create_session(&self) -> Session {
        let session = self.store.create().await;
        tracing::info!(session_id = %session.id, "Session created");
        session
    }

    /// Get the current state of a session.
    pub async fn get_session(&self, id: &str) -> Result<Session> {
        self.store.get(id).await
    }

    /// Delete a session and its state.
    pub async fn delete_session(&self, id: &str) -> Result<()> {
        self.store.delete(id).await?;
        tracing::info!(session_id = %id, "Session deleted");
        Ok(())
    }

    /// Process one administrator message and return the assistant turn.
    ///
    /// Classification and generation failures degrade to an honest fallback
    /// reply rather than erroring; the turn is recorded either way. Commit
    /// conflicts rerun the whole cycle against fresh state, up to the
    /// configured attempt budget, after which the turns are recorded through
    /// the store's serialized append and a transient error is returned.
    pub async fn submit_message(&self, id: &str, text: &str) -> Result<Turn> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidInput("message must not be empty".into()));
        }

        for attempt in 1..=self.commit_attempts {
            let mut session = self.store.get(id).await?;
            session.messages.push(Turn::user(text));

            let assistant = self.produce_reply(&session).await;
            session.messages.push(assistant.clone());

            if self.compactor.is_due(&session) {
                match timeout(self.generate_timeout, self.compactor.compact(&mut session)).await {
                    Ok(Ok(_)) => {}
                    Ok(Err(err)) => {
                        tracing::warn!(session_id = %id, error = %err, "Compaction failed, keeping full history");
                    }
                    Err(_) => {
                        tracing::warn!(session_id = %id, "Compaction timed out, keeping full history");
                    }
                }
            }

            match self.store.commit(session).await {
                Ok(_) => return Ok(assistant),
                Err(err) if err.is_conflict() => {
                    tracing::warn!(
                        session_id = %id,
                        attempt,
                        "Commit conflict, rerunning turn against fresh state"
                    );
                }
                Err(err) => return Err(err),
            }
        }

        // Retry budget exhausted: record the exchange without the optimistic
        // cycle so the administrator's message is not lost.
        self.store
            .append_degraded(id, vec![Turn::user(text), Turn::assistant(FALLBACK_REPLY)])
            .await?;

        Err(Error::Transient(format!(
            "session {id} stayed contended for {} attempts",
            self.commit_attempts
        )))
    }

    /// Classify the turn and produce the assistant's reply.
    ///
    /// Never fails: routing and generation errors (including timeouts) fall
    /// back to a canned reply so the turn can still be recorded.
    async fn produce_reply(&self, session: &Session) -> Turn {
        let summary = session.summary.as_deref();

        let decision = match timeout(
            self.route_timeout,
            self.backend.route(summary, &session.messages),
        )
        .await
        {
            Ok(Ok(decision)) => decision,
            Ok(Err(err)) => {
                tracing::warn!(session_id = %session.id, error = %err, "Routing failed");
                return Turn::assistant(FALLBACK_REPLY);
            }
            Err(_) => {
                tracing::warn!(session_id = %session.id, "Routing timed out");
                return Turn::assistant(FALLBACK_REPLY);
            }
        };

        match decision {
            RouteDecision::Reply { content } => Turn::assistant(content),
            RouteDecision::Analytics { category } => {
                let report = match self.reports.fetch(category).await {
                    Ok(report) => report,
                    Err(err) => {
                        tracing::warn!(
                            session_id = %session.id,
                            category = %category,
                            error = %err,
                            "Report fetch failed, answering ungrounded"
                        );
                        None
                    }
                };

                if report.is_none() {
                    tracing::info!(
                        session_id = %session.id,
                        category = %category,
                        "Report unavailable, answering with availability caveat"
                    );
                }

                match timeout(
                    self.generate_timeout,
                    self.backend
                        .answer(summary, &session.messages, report.as_deref()),
                )
                .await
                {
                    Ok(Ok(reply)) => Turn::assistant(reply),
                    Ok(Err(err)) => {
                        tracing::warn!(session_id = %session.id, error = %err, "Generation failed");
                        Turn::assistant(FALLBACK_REPLY)
                    }
                    Err(_) => {
                        tracing::warn!(session_id = %session.id, "Generation timed out");
                        Turn::assistant(FALLBACK_REPLY)
                    }
                }
            }
        }
    }
}
