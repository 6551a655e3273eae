//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub cors_origin: String,
    pub openai_api_key: Option<String>,
    pub answer_model: String,
    pub prompt_model: String,
    pub midtrans_server_key: Option<String>,
    pub midtrans_api_base: String,
    pub midtrans_snap_base: String,
    /// Token balance granted when a profile is created on first access.
    pub starting_token_grant: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        // --- Load API Keys (as optional) ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let midtrans_server_key = std::env::var("MIDTRANS_SERVER_KEY").ok();

        // --- Load Adapter-specific Settings ---
        let answer_model =
            std::env::var("ANSWER_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        let prompt_model =
            std::env::var("PROMPT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let midtrans_api_base = std::env::var("MIDTRANS_API_BASE")
            .unwrap_or_else(|_| "https://api.sandbox.midtrans.com".to_string());
        let midtrans_snap_base = std::env::var("MIDTRANS_SNAP_BASE")
            .unwrap_or_else(|_| "https://app.sandbox.midtrans.com".to_string());

        let starting_grant_str =
            std::env::var("STARTING_TOKEN_GRANT").unwrap_or_else(|_| "10".to_string());
        let starting_token_grant = starting_grant_str.parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(
                "STARTING_TOKEN_GRANT".to_string(),
                format!("'{}' is not a valid token count", starting_grant_str),
            )
        })?;
        if starting_token_grant < 0 {
            return Err(ConfigError::InvalidValue(
                "STARTING_TOKEN_GRANT".to_string(),
                "the starting grant cannot be negative".to_string(),
            ));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            cors_origin,
            openai_api_key,
            answer_model,
            prompt_model,
            midtrans_server_key,
            midtrans_api_base,
            midtrans_snap_base,
            starting_token_grant,
        })
    }
}
