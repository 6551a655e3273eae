//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::ask_task::{process_question, AskError, AskRequest};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use pintarai_core::constants::{default_example_prompts, is_valid_class_level, is_valid_subject};
use pintarai_core::domain::{ChatSession, ExamplePrompt, IdentitySnapshot, UserProfile};
use pintarai_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        ask_handler,
        list_history_handler,
        get_session_handler,
        delete_session_handler,
        clear_history_handler,
        profile_handler,
        delete_profile_handler,
        generate_prompts_handler,
        default_prompts_handler,
        crate::web::payment::payment_notification_handler,
        crate::web::payment::checkout_handler,
    ),
    components(
        schemas(
            AskBody,
            AskResponse,
            PromptsBody,
            PromptsResponse,
            crate::web::payment::PaymentNotification,
            crate::web::payment::NotificationResponse,
            crate::web::payment::CheckoutRequest,
            crate::web::payment::CheckoutResponse,
        )
    ),
    tags(
        (name = "PintarAI API", description = "API endpoints for the homework-help chat service.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// A question submission.
#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AskBody {
    /// Resume this session; omit to start a new one.
    #[serde(default)]
    pub session_id: Option<String>,
    pub class_level: String,
    pub subject: String,
    pub question_text: String,
    #[serde(default)]
    pub uploaded_file_uri: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// The response payload sent after a question has been processed.
#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AskResponse {
    /// The full updated session document.
    #[schema(value_type = Object)]
    pub session: ChatSession,
    /// The id of the turn created by this request.
    pub pair_id: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PromptsBody {
    pub class_level: String,
    pub subject: String,
}

#[derive(Serialize, ToSchema)]
pub struct PromptsResponse {
    #[schema(value_type = Vec<Object>)]
    pub prompts: Vec<ExamplePrompt>,
}

fn ask_error_response(e: AskError) -> (StatusCode, String) {
    match e {
        AskError::Validation(message) => (StatusCode::UNPROCESSABLE_ENTITY, message),
        AskError::SessionNotFound(id) => (
            StatusCode::NOT_FOUND,
            format!("Chat session {id} not found"),
        ),
        AskError::NotSessionOwner => (
            StatusCode::FORBIDDEN,
            "The session belongs to another user".to_string(),
        ),
        AskError::InsufficientBalance => (
            StatusCode::PAYMENT_REQUIRED,
            "Token Anda habis. Silakan isi ulang untuk terus bertanya.".to_string(),
        ),
        AskError::Internal(e) => {
            error!("Failed to process question: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to process question".to_string(),
            )
        }
    }
}

//=========================================================================================
// Question Handler
//=========================================================================================

/// Submit a question, starting a new session or resuming an existing one.
#[utoipa::path(
    post,
    path = "/questions",
    request_body = AskBody,
    responses(
        (status = 200, description = "Question processed; the turn is terminal even if generation failed", body = AskResponse),
        (status = 402, description = "Insufficient token balance"),
        (status = 403, description = "Session owned by another user"),
        (status = 404, description = "Unknown session id"),
        (status = 422, description = "Validation error"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn ask_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
    Json(body): Json<AskBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let request = AskRequest {
        session_id: body.session_id,
        class_level: body.class_level,
        subject: body.subject,
        question_text: body.question_text,
        uploaded_file_uri: body.uploaded_file_uri,
        file_name: body.file_name,
    };

    let outcome = process_question(
        &state.sessions,
        &*state.ledger,
        &*state.answer_adapter,
        &user,
        request,
    )
    .await
    .map_err(ask_error_response)?;

    Ok(Json(AskResponse {
        session: outcome.session,
        pair_id: outcome.pair_id,
    }))
}

//=========================================================================================
// History Handlers
//=========================================================================================

/// List the caller's sessions, most recent first.
#[utoipa::path(
    get,
    path = "/history",
    responses(
        (status = 200, description = "Sessions owned by the caller", body = Vec<Object>),
        (status = 500, description = "History unavailable")
    ),
    params(
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    // A read failure is surfaced, not silently degraded to an empty list:
    // "no history" and "history unavailable" are different answers.
    let sessions = state.sessions.list_for_user(&user.uid).await.map_err(|e| {
        error!("Failed to list history: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load history".to_string(),
        )
    })?;
    Ok(Json(sessions))
}

async fn load_owned_session(
    state: &AppState,
    user: &IdentitySnapshot,
    session_id: &str,
) -> Result<ChatSession, (StatusCode, String)> {
    let session = state.sessions.load(session_id).await.map_err(|e| match e {
        PortError::NotFound(message) => (StatusCode::NOT_FOUND, message),
        other => {
            error!("Failed to load session {session_id}: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load session".to_string(),
            )
        }
    })?;
    if session.user_id != user.uid {
        return Err((
            StatusCode::FORBIDDEN,
            "The session belongs to another user".to_string(),
        ));
    }
    Ok(session)
}

/// Fetch a single session by id.
#[utoipa::path(
    get,
    path = "/history/{session_id}",
    responses(
        (status = 200, description = "The session document", body = Object),
        (status = 403, description = "Session owned by another user"),
        (status = 404, description = "Unknown session id")
    ),
    params(
        ("session_id" = String, Path, description = "The session document id."),
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let session = load_owned_session(&state, &user, &session_id).await?;
    Ok(Json(session))
}

/// Delete a single session.
#[utoipa::path(
    delete,
    path = "/history/{session_id}",
    responses(
        (status = 204, description = "Session deleted"),
        (status = 403, description = "Session owned by another user"),
        (status = 404, description = "Unknown session id")
    ),
    params(
        ("session_id" = String, Path, description = "The session document id."),
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_session_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    load_owned_session(&state, &user, &session_id).await?;
    state.sessions.delete(&session_id).await.map_err(|e| {
        error!("Failed to delete session {session_id}: {e}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to delete session".to_string(),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}

/// Delete the caller's entire history as one batch.
#[utoipa::path(
    delete,
    path = "/history",
    responses(
        (status = 204, description = "History cleared"),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn clear_history_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.sessions.delete_all(&user.uid).await.map_err(|e| {
        error!("Failed to clear history for {}: {e}", user.uid);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to clear history".to_string(),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Profile Handlers
//=========================================================================================

/// Fetch the caller's profile, creating it with the starting token grant on
/// first access.
#[utoipa::path(
    get,
    path = "/profile",
    responses(
        (status = 200, description = "The profile with its token balance", body = Object),
        (status = 500, description = "Internal server error")
    ),
    params(
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let profile: UserProfile = state.ledger.get_or_create_profile(&user).await.map_err(|e| {
        error!("Failed to load profile for {}: {e}", user.uid);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to load profile".to_string(),
        )
    })?;
    Ok(Json(profile))
}

/// Delete the caller's account data: history first, then the profile.
///
/// The identity record itself lives at the identity provider and is deleted
/// there by the client. If the sequence fails partway the inconsistency is
/// surfaced to the caller; there is no compensating rollback.
#[utoipa::path(
    delete,
    path = "/profile",
    responses(
        (status = 204, description = "History and profile deleted"),
        (status = 500, description = "Deletion failed partway; records may be inconsistent")
    ),
    params(
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn delete_profile_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<IdentitySnapshot>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.sessions.delete_all(&user.uid).await.map_err(|e| {
        error!("Failed to clear history while deleting {}: {e}", user.uid);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to clear history; account was not deleted".to_string(),
        )
    })?;
    state.ledger.delete_profile(&user.uid).await.map_err(|e| {
        error!("Failed to delete profile {}: {e}", user.uid);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "History cleared but the profile could not be deleted".to_string(),
        )
    })?;
    Ok(StatusCode::NO_CONTENT)
}

//=========================================================================================
// Prompt Suggestion Handlers
//=========================================================================================

/// Generate two contextual example prompts for a class level and subject.
#[utoipa::path(
    post,
    path = "/prompts/generate",
    request_body = PromptsBody,
    responses(
        (status = 200, description = "Exactly two generated prompts", body = PromptsResponse),
        (status = 422, description = "Unknown class level or subject"),
        (status = 502, description = "Generation exhausted its retries")
    ),
    params(
        ("x-user-id" = String, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_prompts_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PromptsBody>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !is_valid_class_level(&body.class_level)
        || !is_valid_subject(&body.class_level, &body.subject)
    {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            "Jenjang kelas atau mata pelajaran tidak dikenal.".to_string(),
        ));
    }

    let prompts = state
        .prompt_adapter
        .generate_prompts(&body.class_level, &body.subject)
        .await
        .map_err(|e| {
            error!("Prompt generation failed: {e}");
            (StatusCode::BAD_GATEWAY, e.to_string())
        })?;

    Ok(Json(PromptsResponse { prompts }))
}

/// The static fallback prompts shown when generation is unavailable.
#[utoipa::path(
    get,
    path = "/prompts/defaults",
    responses(
        (status = 200, description = "The static prompt set", body = PromptsResponse)
    )
)]
pub async fn default_prompts_handler() -> impl IntoResponse {
    Json(PromptsResponse {
        prompts: default_example_prompts(),
    })
}
