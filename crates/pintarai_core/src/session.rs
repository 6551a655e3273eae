//! crates/pintarai_core/src/session.rs
//!
//! The session store: reconciles a single active `ChatSession` between the
//! caller's memory and the remote chat document store, and lists/deletes
//! historical sessions for a user.
//!
//! Persistence timing: a session is persisted once a turn reaches its
//! terminal state (answer or error text), never while a pair is still
//! pending. A crash mid-request therefore cannot leave a permanently
//! pending record in the store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::ChatSession;
use crate::ports::{ChatStore, PortResult};

/// Orchestrates the `ChatSession` lifecycle over a [`ChatStore`].
///
/// All read/write failures are returned tagged (`PortResult`) rather than
/// swallowed; the presentation layer decides how to degrade.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn ChatStore>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self { store }
    }

    /// Allocates a new session shell: fresh document id, title snapshot of
    /// the first question, no messages yet. The caller appends the first
    /// QAPair before anything is persisted.
    pub fn start_session(
        &self,
        user_id: &str,
        class_level: &str,
        subject: &str,
        first_question: &str,
    ) -> ChatSession {
        ChatSession::new(
            Uuid::new_v4().to_string(),
            user_id,
            class_level,
            subject,
            first_question,
        )
    }

    /// Upserts the full session document (merge semantics). Idempotent, and
    /// a strict no-op for sessions without messages: an empty shell never
    /// produces a remote write.
    pub async fn persist(&self, session: &ChatSession) -> PortResult<()> {
        if session.is_empty() {
            return Ok(());
        }
        self.store.save_session(session).await
    }

    pub async fn load(&self, session_id: &str) -> PortResult<ChatSession> {
        self.store.get_session(session_id).await
    }

    /// All sessions owned by `user_id`, most recent first. The store does
    /// not guarantee server-side ordering on this query shape, so sorting
    /// happens here.
    pub async fn list_for_user(&self, user_id: &str) -> PortResult<Vec<ChatSession>> {
        let mut sessions = self.store.get_sessions_for_user(user_id).await?;
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    pub async fn delete(&self, session_id: &str) -> PortResult<()> {
        self.store.delete_session(session_id).await
    }

    /// Removes every session owned by `user_id` as one atomic batch.
    pub async fn delete_all(&self, user_id: &str) -> PortResult<()> {
        self.store.delete_sessions_for_user(user_id).await
    }
}

/// Sorts sessions descending by `start_time`. Documents whose stored start
/// time was missing or unparsable surface here as [`DateTime::MIN_UTC`] and
/// end up last; the sort itself never fails.
pub fn sort_newest_first(sessions: &mut [ChatSession]) {
    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}

/// The substitute start time for documents with a missing or unparsable
/// timestamp, chosen so they sort after every real session.
pub fn missing_start_time() -> DateTime<Utc> {
    DateTime::<Utc>::MIN_UTC
}
