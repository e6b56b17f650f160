//! In-memory session storage with absolute TTL and optimistic concurrency.
//!
//! The store is the only shared mutable resource in the engine. Mutations
//! are version-checked so that two concurrent commits against the same prior
//! state never both succeed; reads of distinct sessions never block each
//! other. Expired sessions are logically absent to every operation and are
//! physically removed by `sweep_expired` (run periodically by the API
//! binary) or whenever an access finds them.

use super::types::{Session, Turn};
use chrono::Utc;
use insight_common::{Error, Result};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;

/// Concurrency-safe, time-bounded keyed storage of conversation state.
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl SessionStore {
    /// Create a store whose sessions live `ttl` from creation.
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Allocate a new empty session and return a copy of it.
    pub async fn create(&self) -> Session {
        let session = Session::new();
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Get a copy of the current state.
    ///
    /// Reads are passive: they never stamp `last_accessed_at`, so polling a
    /// session cannot extend its lifetime.
    pub async fn get(&self, id: &str) -> Result<Session> {
        let sessions = self.sessions.read().await;
        match sessions.get(id) {
            Some(session) if !session.is_expired(self.ttl) => Ok(session.clone()),
            _ => Err(Error::NotFound(format!("session {id}"))),
        }
    }

    /// Remove a session immediately.
    ///
    /// Re-deleting (or deleting an expired session) yields `NotFound`.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.remove(id) {
            Some(session) if !session.is_expired(self.ttl) => Ok(()),
            _ => Err(Error::NotFound(format!("session {id}"))),
        }
    }

    /// Atomically replace stored state.
    ///
    /// Succeeds only when the stored version still equals the submitted
    /// session's version; the committed copy gets a bumped version and a
    /// fresh `last_accessed_at`. `Conflict` means another mutation won the
    /// race and the caller should re-fetch and retry.
    pub async fn commit(&self, mut updated: Session) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        let current = match sessions.get(&updated.id) {
            Some(session) if !session.is_expired(self.ttl) => session,
            _ => return Err(Error::NotFound(format!("session {}", updated.id))),
        };

        if current.version != updated.version {
            return Err(Error::Conflict(format!(
                "session {} version {} is stale (stored {})",
                updated.id, updated.version, current.version
            )));
        }

        updated.version += 1;
        updated.last_accessed_at = Utc::now();
        sessions.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    /// Append turns to the live state under the store lock.
    ///
    /// Used only by the orchestrator's failure path, after the optimistic
    /// retry budget is exhausted, so the administrator's message is still
    /// recorded. Counts as one committed mutation: the version is bumped
    /// and `last_accessed_at` is stamped.
    pub async fn append_degraded(&self, id: &str, turns: Vec<Turn>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if !session.is_expired(self.ttl) => {
                session.messages.extend(turns);
                session.version += 1;
                session.last_accessed_at = Utc::now();
                Ok(())
            }
            _ => Err(Error::NotFound(format!("session {id}"))),
        }
    }

    /// Remove every expired session; returns how many were reaped.
    pub async fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.ttl));
        before - sessions.len()
    }

    /// Number of live (unexpired) sessions.
    pub async fn len(&self) -> usize {
        let sessions = self.sessions.read().await;
        sessions
            .values()
            .filter(|session| !session.is_expired(self.ttl))
            .count()
    }

    /// Whether the store holds no live sessions.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
