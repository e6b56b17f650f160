//! Session and turn types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Speaker role for a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Administrator message
    User,
    /// Chatbot response
    Assistant,
}

impl Role {
    /// String representation used in prompts and wire payloads.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single turn in a conversation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Speaker role
    pub role: Role,
    /// Message text
    pub content: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

impl Turn {
    /// Create a user turn stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an assistant turn stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// A bounded-lifetime conversation context.
///
/// The `version` counter backs the store's optimistic concurrency check and
/// never leaves the process; API payloads carry everything else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique token, generated on creation
    pub id: String,
    /// Creation time; the absolute TTL is measured from here
    pub created_at: DateTime<Utc>,
    /// Stamped on every committed mutation
    pub last_accessed_at: DateTime<Utc>,
    /// Conversation history in append order
    pub messages: Vec<Turn>,
    /// Condensed representation of compacted history
    pub summary: Option<String>,
    /// Optimistic-concurrency counter
    #[serde(skip)]
    pub version: u64,
}

impl Session {
    /// Create a fresh, empty session with a random id.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            last_accessed_at: now,
            messages: Vec::new(),
            summary: None,
            version: 0,
        }
    }

    /// Whether the absolute lifetime has elapsed.
    ///
    /// Expiry is measured from `created_at` regardless of activity, so a
    /// busy session still ends on schedule.
    pub fn is_expired(&self, ttl: Duration) -> bool {
        let age = Utc::now().signed_duration_since(self.created_at);
        age.to_std().map_or(false, |age| age >= ttl)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
