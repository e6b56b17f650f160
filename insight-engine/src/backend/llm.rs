//! LLM-backed implementation of the completion backend.
//!
//! Prompt rendering and structured-output parsing live here. The routing
//! call asks the model for a single tagged JSON object; replies and
//! summaries are plain text.

use super::{format_history, CompletionBackend, RouteDecision};
use crate::provider::Provider;
use crate::session::types::Turn;
use async_trait::async_trait;
use insight_common::{Error, Result};
use std::sync::Arc;

const ROUTER_SYSTEM_PROMPT: &str = "\
You are the routing step of an administrative assistant for a mobile-app \
analytics platform. Read the conversation and decide how to handle the \
administrator's latest message.

Respond with exactly one JSON object, nothing else:
- If the message is a greeting, small talk, a clarifying question, or is \
out of scope, answer it yourself:
  {\"kind\": \"reply\", \"content\": \"<your reply>\"}
- If the message asks about platform data, pick the single best-matching \
category:
  {\"kind\": \"analytics\", \"category\": \"<category>\"}

Categories: content (posts, activities, freebies), events (upcoming events \
and participation), registrations (new user signups and growth trends), \
neighborhoods (geographic user distribution), engagement (post engagement, \
time in app, notifications, search), users (active users, top users, \
onboarding, navigation).

If a question spans several categories, choose the one that matters most \
for answering it.";

const ANSWER_SYSTEM_PROMPT: &str = "\
You are an administrative assistant for a mobile-app analytics platform. \
Answer the administrator's latest question using only the analytics report \
below. Never invent figures: if the report does not contain the information \
needed, say explicitly that it is not available. Keep answers concise and \
concrete.";

const SUMMARY_SYSTEM_PROMPT: &str = "\
Condense the conversation below into a short briefing that preserves the \
facts, figures, and administrator preferences needed to answer follow-up \
questions. Write in the third person. Output only the briefing text.";

const REPORT_UNAVAILABLE_NOTICE: &str = "\
[The analytics report for this topic is temporarily unavailable. State \
this to the administrator; do not guess at any figures.]";

/// Completion backend over an HTTP LLM provider.
pub struct LlmBackend {
    provider: Arc<dyn Provider>,
}

impl LlmBackend {
    /// Create a backend over the given provider.
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl CompletionBackend for LlmBackend {
    async fn route(&self, summary: Option<&str>, history: &[Turn]) -> Result<RouteDecision> {
        let conversation = format_history(summary, history);
        let raw = self
            .provider
            .chat(Some(ROUTER_SYSTEM_PROMPT), &conversation)
            .await
            .map_err(|e| Error::Routing(format!("classification call failed: {e}")))?;

        parse_route_decision(&raw)
    }

    async fn answer(
        &self,
        summary: Option<&str>,
        history: &[Turn],
        report: Option<&str>,
    ) -> Result<String> {
        let grounding = report.unwrap_or(REPORT_UNAVAILABLE_NOTICE);
        let prompt = format!(
            "## Analytics report\n{grounding}\n\n## Conversation\n{}",
            format_history(summary, history)
        );

        let reply = self
            .provider
            .chat(Some(ANSWER_SYSTEM_PROMPT), &prompt)
            .await
            .map_err(|e| Error::Generation(format!("generation call failed: {e}")))?;

        let reply = reply.trim();
        if reply.is_empty() {
            return Err(Error::Generation("empty completion".into()));
        }
        Ok(reply.to_string())
    }

    async fn summarize(&self, prior_summary: Option<&str>, turns: &[Turn]) -> Result<String> {
        let conversation = format_history(prior_summary, turns);
        let summary = self
            .provider
            .chat(Some(SUMMARY_SYSTEM_PROMPT), &conversation)
            .await
            .map_err(|e| Error::Generation(format!("summarization call failed: {e}")))?;

        let summary = summary.trim();
        if summary.is_empty() {
            return Err(Error::Generation("empty summary".into()));
        }
        Ok(summary.to_string())
    }
}

/// Parse the router's structured output.
///
/// Accepts a fenced ```json block or an inline object; anything else is a
/// routing failure the orchestrator degrades from.
fn parse_route_decision(raw: &str) -> Result<RouteDecision> {
    for block in extract_json_blocks(raw) {
        if let Ok(decision) = serde_json::from_str::<RouteDecision>(&block) {
            return Ok(decision);
        }
    }

    if let Some(decision) = find_inline_decision(raw) {
        return Ok(decision);
    }

    Err(Error::Routing(format!(
        "unparseable classification output: {}",
        truncate(raw, 200)
    )))
}

/// Extract the contents of ```json fenced blocks.
fn extract_json_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut remaining = text;

    while let Some(start) = remaining.find("```json") {
        let after_marker = &remaining[start + 7..];
        let content_start = usize::from(after_marker.starts_with('\n'));

        if let Some(end) = after_marker[content_start..].find("```") {
            let json_content = &after_marker[content_start..content_start + end];
            blocks.push(json_content.trim().to_string());
            remaining = &after_marker[content_start + end + 3..];
        } else {
            // Incomplete block - try to salvage
            let json_content = after_marker[content_start..].trim();
            if !json_content.is_empty() {
                blocks.push(json_content.to_string());
            }
            break;
        }
    }

    blocks
}

/// Find an inline `{"kind": ...}` object in free text.
fn find_inline_decision(text: &str) -> Option<RouteDecision> {
    let patterns = [r#"{"kind":"#, r#"{ "kind":"#, r#"{"kind" :"#];

    for pattern in patterns {
        if let Some(start) = text.find(pattern) {
            let rest = &text[start..];
            if let Some(end) = find_matching_brace(rest) {
                if let Ok(decision) = serde_json::from_str::<RouteDecision>(&rest[..=end]) {
                    return Some(decision);
                }
            }
        }
    }

    None
}

/// Find the index of the matching closing brace
fn find_matching_brace(s: &str) -> Option<usize> {
    let mut depth = 0;
    let mut in_string = false;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }

        match c {
            '\\' if in_string => escape = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }

    None
}

/// Truncate string for logging
fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::AnalyticsCategory;
    use crate::provider::Provider;

    #[test]
    fn parses_bare_json_object() {
        let decision =
            parse_route_decision(r#"{"kind": "analytics", "category": "registrations"}"#).unwrap();
        assert_eq!(
            decision,
            RouteDecision::Analytics {
                category: AnalyticsCategory::Registrations
            }
        );
    }

    #[test]
    fn parses_fenced_json_block() {
        let raw = "Here is my decision:\n```json\n{\"kind\": \"reply\", \"content\": \"Hi!\"}\n```\n";
        let decision = parse_route_decision(raw).unwrap();
        assert_eq!(decision, RouteDecision::Reply { content: "Hi!".into() });
    }

    #[test]
    fn parses_inline_object_in_prose() {
        let raw = r#"Sure. {"kind": "analytics", "category": "events"} is my pick."#;
        let decision = parse_route_decision(raw).unwrap();
        assert_eq!(
            decision,
            RouteDecision::Analytics {
                category: AnalyticsCategory::Events
            }
        );
    }

    #[test]
    fn inline_parse_handles_braces_in_strings() {
        let raw = r#"{"kind": "reply", "content": "use {curly} braces"}"#;
        let decision = parse_route_decision(raw).unwrap();
        assert_eq!(
            decision,
            RouteDecision::Reply {
                content: "use {curly} braces".into()
            }
        );
    }

    #[test]
    fn rejects_free_text() {
        let err = parse_route_decision("I think this is about users.").unwrap_err();
        assert!(matches!(err, Error::Routing(_)));
    }

    #[test]
    fn rejects_unknown_category() {
        let err =
            parse_route_decision(r#"{"kind": "analytics", "category": "finance"}"#).unwrap_err();
        assert!(matches!(err, Error::Routing(_)));
    }

    struct CannedProvider(String);

    #[async_trait]
    impl Provider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        async fn chat(&self, _system: Option<&str>, _message: &str) -> Result<String> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn answer_rejects_empty_completion() {
        let backend = LlmBackend::new(Arc::new(CannedProvider("   ".into())));
        let err = backend
            .answer(None, &[Turn::user("how many users?")], Some("42 users"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Generation(_)));
    }

    #[tokio::test]
    async fn route_wraps_provider_output() {
        let backend = LlmBackend::new(Arc::new(CannedProvider(
            r#"{"kind": "reply", "content": "Hello, admin."}"#.into(),
        )));
        let decision = backend.route(None, &[Turn::user("hi")]).await.unwrap();
        assert_eq!(
            decision,
            RouteDecision::Reply {
                content: "Hello, admin.".into()
            }
        );
    }
}
