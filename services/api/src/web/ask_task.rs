//! services/api/src/web/ask_task.rs
//!
//! This module contains the asynchronous "worker" function responsible for
//! handling a single question submission: token spend, session bookkeeping,
//! answer generation, and persistence.

use pintarai_core::constants::{is_valid_class_level, is_valid_subject};
use pintarai_core::domain::{AnswerRequest, ChatSession, IdentitySnapshot};
use pintarai_core::ports::{AnswerService, PortError, TokenLedger};
use pintarai_core::session::SessionStore;
use tracing::{error, info};

/// The inbound question submission, already deserialized by the handler.
#[derive(Debug, Clone)]
pub struct AskRequest {
    /// Resume an existing session, or `None` to start a new one.
    pub session_id: Option<String>,
    pub class_level: String,
    pub subject: String,
    pub question_text: String,
    pub uploaded_file_uri: Option<String>,
    pub file_name: Option<String>,
}

/// The result of a processed question: the updated session and the id of
/// the turn this request created.
#[derive(Debug)]
pub struct AskOutcome {
    pub session: ChatSession,
    pub pair_id: String,
}

/// Everything that can go wrong before or around answer generation. Answer
/// generation failures themselves are not here: they resolve the turn with
/// a visible error string instead (the record always reaches a terminal
/// state).
#[derive(Debug, thiserror::Error)]
pub enum AskError {
    #[error("{0}")]
    Validation(String),
    #[error("Chat session {0} not found")]
    SessionNotFound(String),
    #[error("The session belongs to another user")]
    NotSessionOwner,
    #[error("Insufficient token balance")]
    InsufficientBalance,
    #[error("Internal error: {0}")]
    Internal(PortError),
}

fn validate(request: &AskRequest, is_new_session: bool) -> Result<(), AskError> {
    if request.question_text.trim().is_empty() {
        return Err(AskError::Validation(
            "Pertanyaan tidak boleh kosong.".to_string(),
        ));
    }
    // Context is immutable once a session exists; only a new session needs
    // its context checked against the curriculum tables.
    if is_new_session {
        if !is_valid_class_level(&request.class_level) {
            return Err(AskError::Validation(format!(
                "Jenjang kelas '{}' tidak dikenal.",
                request.class_level
            )));
        }
        if !is_valid_subject(&request.class_level, &request.subject) {
            return Err(AskError::Validation(format!(
                "Mata pelajaran '{}' tidak tersedia untuk {}.",
                request.subject, request.class_level
            )));
        }
    }
    if let Some(uri) = &request.uploaded_file_uri {
        if !uri.starts_with("data:") {
            return Err(AskError::Validation(
                "Lampiran harus berupa data URI.".to_string(),
            ));
        }
    }
    Ok(())
}

/// The main asynchronous task for handling a single user question.
pub async fn process_question(
    sessions: &SessionStore,
    ledger: &dyn TokenLedger,
    answer_service: &dyn AnswerService,
    user: &IdentitySnapshot,
    request: AskRequest,
) -> Result<AskOutcome, AskError> {
    validate(&request, request.session_id.is_none())?;

    // Resume the identified session or start a fresh shell. Nothing has
    // touched remote storage yet.
    let mut session = match &request.session_id {
        Some(session_id) => {
            let session = sessions.load(session_id).await.map_err(|e| match e {
                PortError::NotFound(_) => AskError::SessionNotFound(session_id.clone()),
                other => AskError::Internal(other),
            })?;
            if session.user_id != user.uid {
                return Err(AskError::NotSessionOwner);
            }
            session
        }
        None => sessions.start_session(
            &user.uid,
            &request.class_level,
            &request.subject,
            &request.question_text,
        ),
    };

    // The profile is created lazily with the starting grant, so a first
    // question and a first profile view are interchangeable entry points.
    ledger
        .get_or_create_profile(user)
        .await
        .map_err(AskError::Internal)?;

    // The guarded decrement happens before anything is appended: a rejected
    // submission leaves no trace in the conversation.
    match ledger.spend_token(&user.uid).await {
        Ok(balance) => {
            info!(user_id = %user.uid, balance, "Token spent for question");
        }
        Err(PortError::InsufficientBalance) => return Err(AskError::InsufficientBalance),
        Err(e) => return Err(AskError::Internal(e)),
    }

    let pair_id = session.append_pending(
        &request.question_text,
        request.uploaded_file_uri.clone(),
        request.file_name.clone(),
    );

    // The session's own context wins over whatever the request carried.
    let answer_request = AnswerRequest {
        class_level: session.class_level.clone(),
        subject: session.subject.clone(),
        question_text: request.question_text.clone(),
        uploaded_file_uri: request.uploaded_file_uri.clone(),
        file_name: request.file_name.clone(),
    };

    // Either branch resolves the pair: a question is never left permanently
    // pending once a failure is observed. The pair id captured above is the
    // only thing resolution targets.
    match answer_service.answer_question(&answer_request).await {
        Ok(answer) => {
            session.resolve(&pair_id, answer);
        }
        Err(e) => {
            error!(user_id = %user.uid, "Answer generation failed: {e}");
            session.resolve(&pair_id, format!("Maaf, terjadi kesalahan: {e}"));
        }
    }

    sessions.persist(&session).await.map_err(AskError::Internal)?;

    Ok(AskOutcome { session, pair_id })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use pintarai_core::domain::{AnswerRequest, IdentitySnapshot};
    use pintarai_core::ports::{AnswerService, PortError, PortResult};
    use pintarai_core::session::SessionStore;
    use pintarai_core::testing::MemoryStore;

    use super::{process_question, AskError, AskRequest};

    struct StubAnswer {
        response: PortResult<String>,
    }

    impl StubAnswer {
        fn ok(text: &str) -> Self {
            Self {
                response: Ok(text.to_string()),
            }
        }

        fn failing() -> Self {
            Self {
                response: Err(PortError::Unexpected("model unreachable".to_string())),
            }
        }
    }

    #[async_trait]
    impl AnswerService for StubAnswer {
        async fn answer_question(&self, _request: &AnswerRequest) -> PortResult<String> {
            match &self.response {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(PortError::Unexpected(e.to_string())),
            }
        }
    }

    fn request(question: &str) -> AskRequest {
        AskRequest {
            session_id: None,
            class_level: "SMA Kelas 10".to_string(),
            subject: "Fisika".to_string(),
            question_text: question.to_string(),
            uploaded_file_uri: None,
            file_name: None,
        }
    }

    fn harness(starting_grant: i64) -> (SessionStore, Arc<MemoryStore>, IdentitySnapshot) {
        let memory = Arc::new(MemoryStore::new(starting_grant));
        let sessions = SessionStore::new(memory.clone());
        (sessions, memory, IdentitySnapshot::new("u1"))
    }

    #[tokio::test]
    async fn first_question_creates_and_persists_a_session() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::ok("Gaya yang melawan gerak relatif.");

        let outcome = process_question(&sessions, &*memory, &answer, &user, request("Apa itu gaya gesek?"))
            .await
            .unwrap();

        assert_eq!(outcome.session.title, "Apa itu gaya gesek?");
        assert_eq!(outcome.session.messages.len(), 1);
        assert!(!outcome.session.messages[0].is_pending());
        assert_eq!(memory.balance("u1"), Some(9));

        let stored = sessions.load(&outcome.session.id).await.unwrap();
        assert_eq!(stored, outcome.session);
    }

    #[tokio::test]
    async fn second_question_with_empty_balance_is_rejected_without_a_turn() {
        let (sessions, memory, user) = harness(1);
        let answer = StubAnswer::ok("42");

        let first = process_question(&sessions, &*memory, &answer, &user, request("Pertama"))
            .await
            .unwrap();
        assert_eq!(memory.balance("u1"), Some(0));

        let mut second = request("Kedua");
        second.session_id = Some(first.session.id.clone());
        let err = process_question(&sessions, &*memory, &answer, &user, second)
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::InsufficientBalance));

        // The rejected question appended nothing.
        let stored = sessions.load(&first.session.id).await.unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(memory.balance("u1"), Some(0));
    }

    #[tokio::test]
    async fn empty_question_is_rejected_before_any_side_effect() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::ok("x");

        let err = process_question(&sessions, &*memory, &answer, &user, request("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Validation(_)));
        assert_eq!(memory.save_calls(), 0);
        assert_eq!(memory.balance("u1"), None);
    }

    #[tokio::test]
    async fn unknown_subject_for_the_level_is_rejected() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::ok("x");

        let mut bad = request("Soal");
        bad.class_level = "SD Kelas 3".to_string();
        bad.subject = "Fisika".to_string();
        let err = process_question(&sessions, &*memory, &answer, &user, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Validation(_)));
    }

    #[tokio::test]
    async fn generator_failure_still_leaves_a_terminal_turn() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::failing();

        let outcome = process_question(&sessions, &*memory, &answer, &user, request("Soal sulit"))
            .await
            .unwrap();

        let pair = &outcome.session.messages[0];
        assert!(!pair.is_pending());
        assert!(pair.answer.starts_with("Maaf, terjadi kesalahan:"));

        // The failed turn is persisted in its terminal state, and the token
        // stays spent.
        let stored = sessions.load(&outcome.session.id).await.unwrap();
        assert_eq!(stored.messages[0].answer, pair.answer);
        assert_eq!(memory.balance("u1"), Some(9));
    }

    #[tokio::test]
    async fn resumed_session_keeps_its_immutable_context() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::ok("ok");

        let first = process_question(&sessions, &*memory, &answer, &user, request("Pertama"))
            .await
            .unwrap();

        let mut follow_up = request("Kedua");
        follow_up.session_id = Some(first.session.id.clone());
        // A stale client context on a resumed session is ignored.
        follow_up.class_level = "SD Kelas 1".to_string();
        follow_up.subject = "Matematika".to_string();

        let outcome = process_question(&sessions, &*memory, &answer, &user, follow_up)
            .await
            .unwrap();
        assert_eq!(outcome.session.id, first.session.id);
        assert_eq!(outcome.session.class_level, "SMA Kelas 10");
        assert_eq!(outcome.session.subject, "Fisika");
        assert_eq!(outcome.session.messages.len(), 2);
    }

    #[tokio::test]
    async fn resuming_someone_elses_session_is_forbidden() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::ok("ok");

        let first = process_question(&sessions, &*memory, &answer, &user, request("Milik u1"))
            .await
            .unwrap();

        let intruder = IdentitySnapshot::new("u2");
        let mut attempt = request("Coba ambil alih");
        attempt.session_id = Some(first.session.id.clone());
        let err = process_question(&sessions, &*memory, &answer, &intruder, attempt)
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::NotSessionOwner));
    }

    #[tokio::test]
    async fn non_data_uri_attachment_is_rejected() {
        let (sessions, memory, user) = harness(10);
        let answer = StubAnswer::ok("ok");

        let mut bad = request("Soal");
        bad.uploaded_file_uri = Some("https://example.com/soal.png".to_string());
        let err = process_question(&sessions, &*memory, &answer, &user, bad)
            .await
            .unwrap_err();
        assert!(matches!(err, AskError::Validation(_)));
    }
}
