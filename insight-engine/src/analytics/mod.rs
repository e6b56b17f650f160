//! Analytics report provider.
//!
//! Reports are pre-aggregated markdown blobs generated out-of-band on a
//! fixed schedule; the engine only reads them. A category may map to
//! several files; the provider concatenates whichever are readable.

use async_trait::async_trait;
use insight_common::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Fixed set of analytics topics a question can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyticsCategory {
    Content,
    Events,
    Registrations,
    Neighborhoods,
    Engagement,
    Users,
}

impl AnalyticsCategory {
    /// All categories, in a stable order.
    pub const ALL: [Self; 6] = [
        Self::Content,
        Self::Events,
        Self::Registrations,
        Self::Neighborhoods,
        Self::Engagement,
        Self::Users,
    ];

    /// Lowercase name as used in routing payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Content => "content",
            Self::Events => "events",
            Self::Registrations => "registrations",
            Self::Neighborhoods => "neighborhoods",
            Self::Engagement => "engagement",
            Self::Users => "users",
        }
    }

    /// Report files that make up this category's grounding text.
    pub const fn report_files(self) -> &'static [&'static str] {
        match self {
            Self::Content => &["content_creation.md"],
            Self::Events => &["upcoming_events.md"],
            Self::Registrations => &["new_user_stats.md", "user_registration_trends.md"],
            Self::Neighborhoods => &["neighborhood_distribution.md"],
            Self::Engagement => &[
                "post_engagement.md",
                "time_by_section.md",
                "time_by_user_type.md",
                "push_notifications.md",
                "search_behavior.md",
                "app_activity_time.md",
            ],
            Self::Users => &[
                "active_users.md",
                "top_users.md",
                "onboarding_performance.md",
                "navigation_patterns.md",
            ],
        }
    }
}

impl std::fmt::Display for AnalyticsCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of pre-aggregated report text, one blob per category.
#[async_trait]
pub trait ReportProvider: Send + Sync {
    /// Fetch the report for a category; `Ok(None)` means not available
    /// (stale or never generated), which the engine degrades gracefully.
    async fn fetch(&self, category: AnalyticsCategory) -> Result<Option<String>>;
}

/// Reads category reports from a directory of markdown files.
pub struct FileReportProvider {
    reports_dir: PathBuf,
}

impl FileReportProvider {
    /// Create a provider over the given reports directory.
    pub fn new(reports_dir: impl Into<PathBuf>) -> Self {
        Self {
            reports_dir: reports_dir.into(),
        }
    }
}

#[async_trait]
impl ReportProvider for FileReportProvider {
    async fn fetch(&self, category: AnalyticsCategory) -> Result<Option<String>> {
        let mut parts = Vec::new();

        for filename in category.report_files() {
            let path = self.reports_dir.join(filename);
            match tokio::fs::read_to_string(&path).await {
                Ok(content) => parts.push(content),
                Err(err) => {
                    // A single missing file is expected when a generator run
                    // was partial; the category may still be answerable.
                    tracing::warn!(
                        category = %category,
                        file = %path.display(),
                        error = %err,
                        "Skipping unreadable report file"
                    );
                }
            }
        }

        if parts.is_empty() {
            Ok(None)
        } else {
            Ok(Some(parts.join("\n\n")))
        }
    }
}
