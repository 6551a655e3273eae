//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        answer_llm::OpenAiAnswerAdapter, db::DbAdapter, payment::MidtransAdapter,
        prompt_llm::OpenAiPromptAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        ask_handler, checkout_handler, clear_history_handler, default_prompts_handler,
        delete_profile_handler, delete_session_handler, generate_prompts_handler,
        get_session_handler, list_history_handler, payment_notification_handler, profile_handler,
        require_user, rest::ApiDoc, state::AppState,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use pintarai_core::session::SessionStore;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone(), config.starting_token_grant));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Initialize Service Adapters ---
    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let answer_adapter = Arc::new(OpenAiAnswerAdapter::new(
        openai_client.clone(),
        config.answer_model.clone(),
    ));
    let prompt_adapter = Arc::new(OpenAiPromptAdapter::new(
        openai_client.clone(),
        config.prompt_model.clone(),
    ));

    let midtrans_server_key = config
        .midtrans_server_key
        .as_ref()
        .ok_or_else(|| ApiError::Internal("MIDTRANS_SERVER_KEY is required".to_string()))?;
    let payment_gateway = Arc::new(MidtransAdapter::new(
        midtrans_server_key.clone(),
        config.midtrans_api_base.clone(),
        config.midtrans_snap_base.clone(),
    ));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        sessions: SessionStore::new(db_adapter.clone()),
        ledger: db_adapter,
        config: config.clone(),
        answer_adapter,
        prompt_adapter,
        payment_gateway,
    });

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .map_err(|e| ApiError::Internal(format!("Invalid CORS_ORIGIN: {e}")))?,
        )
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    // Public routes (no identity required): the gateway webhook and the
    // static prompt fallback.
    let public_routes = Router::new()
        .route("/api/payment-notification", post(payment_notification_handler))
        .route("/prompts/defaults", get(default_prompts_handler));

    // Protected routes (identity required)
    let protected_routes = Router::new()
        .route("/questions", post(ask_handler))
        .route("/history", get(list_history_handler).delete(clear_history_handler))
        .route(
            "/history/{session_id}",
            get(get_session_handler).delete(delete_session_handler),
        )
        .route("/profile", get(profile_handler).delete(delete_profile_handler))
        .route("/prompts/generate", post(generate_prompts_handler))
        .route("/payments/checkout", post(checkout_handler))
        .layer(axum_middleware::from_fn(require_user));

    // Combine API routes. The body limit covers inline-encoded attachments.
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
