//! Context compaction using LLM summarization.
//!
//! Bounds conversation history: once a session's turn count passes the
//! configured threshold, everything but the most recent turns is condensed
//! into the running summary. Compaction is lossy and one-way; the dropped
//! turns are not recoverable.

use super::types::Session;
use crate::backend::CompletionBackend;
use insight_common::Result;
use std::sync::Arc;

/// Compacts conversation history into a concise summary.
pub struct Compactor {
    backend: Arc<dyn CompletionBackend>,
    threshold: usize,
    keep_recent: usize,
}

impl Compactor {
    /// Create a compactor.
    ///
    /// `threshold` is the turn count that triggers compaction;
    /// `keep_recent` turns are kept verbatim afterwards.
    pub fn new(backend: Arc<dyn CompletionBackend>, threshold: usize, keep_recent: usize) -> Self {
        // keep_recent must leave something to condense
        let keep_recent = keep_recent.min(threshold.saturating_sub(1));
        Self {
            backend,
            threshold,
            keep_recent,
        }
    }

    /// Whether the session is due for compaction.
    pub fn is_due(&self, session: &Session) -> bool {
        session.messages.len() > self.threshold
    }

    /// Condense the session's older turns into its summary.
    ///
    /// Returns `false` without touching the session when it is at or below
    /// the threshold, which makes back-to-back invocations idempotent. On
    /// summarization failure the session is left unchanged; history stays
    /// intact and the next turn triggers another attempt.
    pub async fn compact(&self, session: &mut Session) -> Result<bool> {
        if !self.is_due(session) {
            return Ok(false);
        }

        let split = session.messages.len() - self.keep_recent;
        let summary = self
            .backend
            .summarize(session.summary.as_deref(), &session.messages[..split])
            .await?;

        tracing::debug!(
            session_id = %session.id,
            condensed = split,
            kept = self.keep_recent,
            "Compacted conversation history"
        );

        session.summary = Some(summary);
        session.messages.drain(..split);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsCategory;
    use crate::backend::RouteDecision;
    use crate::session::types::Turn;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Summarizer that records what it was asked to condense.
    struct RecordingBackend {
        calls: Mutex<Vec<(Option<String>, usize)>>,
    }

    impl RecordingBackend {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionBackend for RecordingBackend {
        async fn route(
            &self,
            _summary: Option<&str>,
            _history: &[Turn],
        ) -> insight_common::Result<RouteDecision> {
            Ok(RouteDecision::Analytics {
                category: AnalyticsCategory::Users,
            })
        }

        async fn answer(
            &self,
            _summary: Option<&str>,
            _history: &[Turn],
            _report: Option<&str>,
        ) -> insight_common::Result<String> {
            Ok("answer".into())
        }

        async fn summarize(
            &self,
            prior_summary: Option<&str>,
            turns: &[Turn],
        ) -> insight_common::Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prior_summary.map(String::from), turns.len()));
            Ok(format!("condensed {} turns", turns.len()))
        }
    }

    fn session_with_turns(count: usize) -> Session {
        let mut session = Session::new();
        for i in 0..count {
            session.messages.push(if i % 2 == 0 {
                Turn::user(format!("question {i}"))
            } else {
                Turn::assistant(format!("answer {i}"))
            });
        }
        session
    }

    #[tokio::test]
    async fn below_threshold_is_a_no_op() {
        let backend = RecordingBackend::new();
        let compactor = Compactor::new(backend.clone(), 10, 4);
        let mut session = session_with_turns(10);
        let before = session.clone();

        assert!(!compactor.compact(&mut session).await.unwrap());
        assert_eq!(session.messages.len(), before.messages.len());
        assert!(session.summary.is_none());
        assert!(backend.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn compacts_to_recent_tail() {
        let backend = RecordingBackend::new();
        let compactor = Compactor::new(backend.clone(), 10, 4);
        let mut session = session_with_turns(14);

        assert!(compactor.compact(&mut session).await.unwrap());
        assert_eq!(session.messages.len(), 4);
        assert_eq!(session.summary.as_deref(), Some("condensed 10 turns"));
        // Tail keeps the newest turns in order
        assert_eq!(session.messages[0].content, "question 10");
        assert_eq!(session.messages[3].content, "answer 13");
    }

    #[tokio::test]
    async fn second_invocation_changes_nothing() {
        let backend = RecordingBackend::new();
        let compactor = Compactor::new(backend.clone(), 10, 4);
        let mut session = session_with_turns(14);

        compactor.compact(&mut session).await.unwrap();
        let after_first = (session.messages.len(), session.summary.clone());

        assert!(!compactor.compact(&mut session).await.unwrap());
        assert_eq!(
            (session.messages.len(), session.summary.clone()),
            after_first
        );
        assert_eq!(backend.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prior_summary_feeds_the_next_one() {
        let backend = RecordingBackend::new();
        let compactor = Compactor::new(backend.clone(), 5, 2);
        let mut session = session_with_turns(8);
        session.summary = Some("earlier context".into());

        compactor.compact(&mut session).await.unwrap();

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_deref(), Some("earlier context"));
        assert_eq!(calls[0].1, 6);
    }

    #[tokio::test]
    async fn keep_recent_is_clamped_below_threshold() {
        let backend = RecordingBackend::new();
        // keep_recent >= threshold would make compaction condense nothing
        let compactor = Compactor::new(backend, 4, 10);
        let mut session = session_with_turns(6);

        assert!(compactor.compact(&mut session).await.unwrap());
        assert_eq!(session.messages.len(), 3);
    }
}
