//! crates/pintarai_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;

use crate::domain::{
    AnswerRequest, ChatSession, ExamplePrompt, IdentitySnapshot, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Insufficient token balance")]
    InsufficientBalance,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// Outcome of crediting a settled payment order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    /// The order was credited now; carries the balance after the credit.
    Credited { new_balance: i64 },
    /// The order id was already in the processed set; nothing was credited.
    AlreadyProcessed,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Remote persistence for chat session documents (`chats` collection).
///
/// Implementations query by equality on `user_id` and do not guarantee any
/// server-side ordering; callers sort client-side.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Upserts the full session document with merge semantics: fields not
    /// included in the write are preserved. Idempotent.
    async fn save_session(&self, session: &ChatSession) -> PortResult<()>;

    async fn get_session(&self, session_id: &str) -> PortResult<ChatSession>;

    /// All sessions owned by `user_id`, in store order (unsorted).
    async fn get_sessions_for_user(&self, user_id: &str) -> PortResult<Vec<ChatSession>>;

    async fn delete_session(&self, session_id: &str) -> PortResult<()>;

    /// Deletes every session owned by `user_id` as a single atomic batch.
    async fn delete_sessions_for_user(&self, user_id: &str) -> PortResult<()>;
}

/// The per-user token balance (`users` collection).
#[async_trait]
pub trait TokenLedger: Send + Sync {
    /// Returns the stored profile, creating it with the starting grant on
    /// first access. Identity fields are mirrored only at creation time.
    async fn get_or_create_profile(&self, identity: &IdentitySnapshot) -> PortResult<UserProfile>;

    /// Guarded decrement: atomically re-checks the balance at write time and
    /// refuses to go below zero. Returns the new balance on success, or
    /// [`PortError::InsufficientBalance`] without mutating state.
    async fn spend_token(&self, user_id: &str) -> PortResult<i64>;

    /// Credits `amount` tokens for a settled order, exactly once per order
    /// id: the order id is recorded in a processed set in the same atomic
    /// transaction as the credit, and replays report
    /// [`CreditOutcome::AlreadyProcessed`].
    async fn credit_order(
        &self,
        order_id: &str,
        user_id: &str,
        amount: i64,
    ) -> PortResult<CreditOutcome>;

    /// Removes the profile record. Callers clear chat history first; there
    /// is no compensating rollback if the sequence fails partway.
    async fn delete_profile(&self, user_id: &str) -> PortResult<()>;
}

/// The Answer Generator: prompt-templated text/vision completion.
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// Answers a student's question given its structured context.
    async fn answer_question(&self, request: &AnswerRequest) -> PortResult<String>;
}

/// Generates contextual example prompts for a class level and subject.
///
/// Implementations validate the output shape (exactly two prompts with known
/// icons) before accepting it.
#[async_trait]
pub trait PromptSuggestionService: Send + Sync {
    async fn generate_prompts(
        &self,
        class_level: &str,
        subject: &str,
    ) -> PortResult<Vec<ExamplePrompt>>;
}

/// A Snap-style checkout session created at the payment gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub token: String,
    pub redirect_url: String,
}

/// Authoritative transaction state, as reported by the gateway itself.
#[derive(Debug, Clone, PartialEq)]
pub struct VerifiedTransaction {
    pub order_id: String,
    pub transaction_status: String,
    pub fraud_status: Option<String>,
}

impl VerifiedTransaction {
    /// A transaction counts as settled when the gateway reports it captured
    /// or settled and not flagged fraudulent.
    pub fn is_settled(&self) -> bool {
        matches!(self.transaction_status.as_str(), "capture" | "settlement")
            && self.fraud_status.as_deref().unwrap_or("accept") == "accept"
    }

    /// Cancelled, denied, and expired transactions are logged but otherwise
    /// ignored.
    pub fn is_failed(&self) -> bool {
        matches!(
            self.transaction_status.as_str(),
            "cancel" | "deny" | "expire"
        )
    }
}

/// The payment gateway. Authenticity checks are delegated entirely to the
/// gateway's own verification endpoint; the signature scheme is not
/// reimplemented here.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a checkout transaction for the given order.
    async fn create_transaction(
        &self,
        order_id: &str,
        gross_amount: i64,
        customer: &IdentitySnapshot,
    ) -> PortResult<CheckoutSession>;

    /// Fetches the authoritative status of an order from the gateway,
    /// verifying that an inbound notification is genuine.
    async fn verify_notification(&self, order_id: &str) -> PortResult<VerifiedTransaction>;
}

#[cfg(test)]
mod tests {
    use super::VerifiedTransaction;

    fn tx(status: &str, fraud: Option<&str>) -> VerifiedTransaction {
        VerifiedTransaction {
            order_id: "PINTARAI-u1-student-1".to_string(),
            transaction_status: status.to_string(),
            fraud_status: fraud.map(str::to_string),
        }
    }

    #[test]
    fn settlement_and_capture_with_accept_are_settled() {
        assert!(tx("settlement", Some("accept")).is_settled());
        assert!(tx("capture", Some("accept")).is_settled());
        assert!(tx("settlement", None).is_settled());
    }

    #[test]
    fn fraud_challenge_is_not_settled() {
        assert!(!tx("capture", Some("challenge")).is_settled());
        assert!(!tx("settlement", Some("deny")).is_settled());
    }

    #[test]
    fn terminal_failures_are_flagged() {
        for status in ["cancel", "deny", "expire"] {
            assert!(tx(status, None).is_failed());
            assert!(!tx(status, None).is_settled());
        }
        assert!(!tx("pending", None).is_failed());
    }
}
