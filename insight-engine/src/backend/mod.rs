//! Completion backend contract.
//!
//! The engine consumes the language model through this trait: one
//! classification call per turn, one grounded generation call when the turn
//! needs analytics data, and one summarization call when history is
//! compacted. Implementations own prompt rendering and output parsing; the
//! engine only interprets the tagged results.

mod llm;

pub use llm::LlmBackend;

use crate::analytics::AnalyticsCategory;
use crate::session::types::Turn;
use async_trait::async_trait;
use insight_common::Result;
use serde::{Deserialize, Serialize};

/// Outcome of classifying the latest turn.
///
/// The backend either answers directly (greeting, refusal, clarification)
/// or names the single analytics category the question belongs to. Ties
/// between categories are broken by the model, not by engine logic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum RouteDecision {
    /// The conversation stays off the analytics track.
    Reply {
        /// Assistant reply text
        content: String,
    },
    /// The question needs an analytics report to answer.
    Analytics {
        /// Best-matching category
        category: AnalyticsCategory,
    },
}

/// Typed interface to the completion backend.
///
/// Every method takes the session's compacted `summary` (if any) plus the
/// verbatim recent history, so implementations can render the full context
/// the model needs for follow-up questions.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Classify the latest turn into a direct reply or an analytics lookup.
    async fn route(&self, summary: Option<&str>, history: &[Turn]) -> Result<RouteDecision>;

    /// Produce the assistant's reply for an analytics question.
    ///
    /// `report` carries the pre-aggregated text for the routed category, or
    /// `None` when it is unavailable; implementations must then state the
    /// unavailability explicitly instead of inventing figures.
    async fn answer(
        &self,
        summary: Option<&str>,
        history: &[Turn],
        report: Option<&str>,
    ) -> Result<String>;

    /// Condense older turns (and any prior summary) into a new summary.
    async fn summarize(&self, prior_summary: Option<&str>, turns: &[Turn]) -> Result<String>;
}

/// Render history as role-labelled lines for prompt injection.
pub(crate) fn format_history(summary: Option<&str>, history: &[Turn]) -> String {
    let mut rendered = String::new();
    if let Some(summary) = summary {
        rendered.push_str("[Earlier conversation, condensed]\n");
        rendered.push_str(summary);
        rendered.push_str("\n\n");
    }
    for turn in history {
        rendered.push_str(turn.role.as_str());
        rendered.push_str(": ");
        rendered.push_str(&turn.content);
        rendered.push('\n');
    }
    rendered
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_decision_reply_serde() {
        let json = r#"{"kind":"reply","content":"Hello!"}"#;
        let decision: RouteDecision = serde_json::from_str(json).unwrap();
        assert_eq!(
            decision,
            RouteDecision::Reply {
                content: "Hello!".into()
            }
        );
    }

    #[test]
    fn route_decision_analytics_serde() {
        let json = r#"{"kind":"analytics","category":"registrations"}"#;
        let decision: RouteDecision = serde_json::from_str(json).unwrap();
        assert_eq!(
            decision,
            RouteDecision::Analytics {
                category: AnalyticsCategory::Registrations
            }
        );
    }

    #[test]
    fn route_decision_rejects_unknown_kind() {
        let json = r#"{"kind":"tool_call","name":"x"}"#;
        assert!(serde_json::from_str::<RouteDecision>(json).is_err());
    }

    #[test]
    fn format_history_labels_roles() {
        let history = vec![Turn::user("hi"), Turn::assistant("hello")];
        let rendered = format_history(None, &history);
        assert_eq!(rendered, "user: hi\nassistant: hello\n");
    }

    #[test]
    fn format_history_leads_with_summary() {
        let history = vec![Turn::user("and now?")];
        let rendered = format_history(Some("We discussed signups."), &history);
        assert!(rendered.starts_with("[Earlier conversation, condensed]\nWe discussed signups."));
        assert!(rendered.ends_with("user: and now?\n"));
    }
}
