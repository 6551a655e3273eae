//! crates/pintarai_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database, but they carry the serde
//! field names of the chat document collection (`questionText`,
//! `classLevel`, ...) so persisted sessions stay compatible with documents
//! written by older clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel answer text marking a question whose answer has not arrived yet.
pub const PENDING_ANSWER: &str = "...";

/// Represents a single question-and-answer exchange within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QAPair {
    /// Creation-ordered, timestamp-derived id, unique within a session.
    pub id: String,
    pub question_text: String,
    /// The answer text; [`PENDING_ANSWER`] until the generator responds,
    /// then either the real answer or a user-visible error string.
    pub answer: String,
    /// Last-update time: creation time while pending, resolution time after.
    pub timestamp: DateTime<Utc>,
    /// Optional inline-encoded file payload (`data:` URI).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_file_uri: Option<String>,
    /// Original file name, independent of whether a preview exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

impl QAPair {
    /// Creates a pair in the pending state, the instant a question is submitted.
    pub fn new_pending(
        question_text: impl Into<String>,
        uploaded_file_uri: Option<String>,
        file_name: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: now.format("%Y-%m-%dT%H:%M:%S%.9fZ").to_string(),
            question_text: question_text.into(),
            answer: PENDING_ANSWER.to_string(),
            timestamp: now,
            uploaded_file_uri,
            file_name,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.answer == PENDING_ANSWER
    }
}

/// Represents one conversation with a fixed class-level/subject context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Document id, allocated at session-creation time.
    pub id: String,
    /// Owning identity from the identity provider.
    pub user_id: String,
    /// Snapshot of the first question's text, immutable after creation.
    pub title: String,
    /// Insertion order is chronological order.
    pub messages: Vec<QAPair>,
    pub class_level: String,
    pub subject: String,
    pub start_time: DateTime<Utc>,
}

impl ChatSession {
    /// Creates the in-memory shell of a new session. The caller appends the
    /// first QAPair; the shell itself is never persisted (see
    /// `SessionStore::persist`).
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        class_level: impl Into<String>,
        subject: impl Into<String>,
        first_question: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            title: first_question.into(),
            messages: Vec::new(),
            class_level: class_level.into(),
            subject: subject.into(),
            start_time: Utc::now(),
        }
    }

    /// Appends a pending QAPair and returns its id for later resolution.
    pub fn append_pending(
        &mut self,
        question_text: impl Into<String>,
        uploaded_file_uri: Option<String>,
        file_name: Option<String>,
    ) -> String {
        let pair = QAPair::new_pending(question_text, uploaded_file_uri, file_name);
        let pair_id = pair.id.clone();
        self.messages.push(pair);
        pair_id
    }

    /// Replaces the pending sentinel of the identified pair with the final
    /// answer (or a user-visible error string) and refreshes its timestamp.
    ///
    /// Idempotent on the pair id: resolving twice with the same text leaves
    /// the same final state, and no new pair is ever created. Returns `false`
    /// when no pair with this id exists any more, so a stale in-flight
    /// response is discarded instead of mutating a turn it did not originate.
    pub fn resolve(&mut self, pair_id: &str, answer: impl Into<String>) -> bool {
        match self.messages.iter_mut().find(|m| m.id == pair_id) {
            Some(pair) => {
                pair.answer = answer.into();
                pair.timestamp = Utc::now();
                true
            }
            None => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Represents a user profile mirrored from the identity provider, plus the
/// one mutable field: the token balance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    #[serde(rename = "photoURL")]
    pub photo_url: Option<String>,
    /// Always >= 0, enforced by the ledger's guarded decrement.
    pub token_balance: i64,
}

/// Identity fields as reported by the identity provider for the current
/// request. Passed explicitly to every store and ledger call; there is no
/// ambient auth state.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentitySnapshot {
    pub uid: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
}

impl IdentitySnapshot {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
            display_name: None,
            photo_url: None,
        }
    }
}

/// Structured input for the Answer Generator.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub class_level: String,
    pub subject: String,
    pub question_text: String,
    pub uploaded_file_uri: Option<String>,
    pub file_name: Option<String>,
}

/// One generated (or static fallback) example prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamplePrompt {
    pub icon: String,
    pub title: String,
    pub prompt: String,
}
