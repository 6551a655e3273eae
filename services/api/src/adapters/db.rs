//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `ChatStore` and `TokenLedger` ports from the `core` crate. It handles
//! all interactions with the PostgreSQL database using `sqlx`.
//!
//! Sessions are stored as documents: one row per session with the message
//! list as `jsonb`, keyed by the session id and queried by equality on the
//! owner. Queries are written without server-side ordering; the session
//! store sorts client-side.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pintarai_core::domain::{ChatSession, IdentitySnapshot, QAPair, UserProfile};
use pintarai_core::ports::{ChatStore, CreditOutcome, PortError, PortResult, TokenLedger};
use pintarai_core::session::missing_start_time;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `ChatStore` and `TokenLedger` ports.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
    starting_grant: i64,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`. `starting_grant` is the token balance a
    /// profile receives when it is created on first access.
    pub fn new(pool: PgPool, starting_grant: i64) -> Self {
        Self {
            pool,
            starting_grant,
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct ChatSessionRecord {
    id: String,
    user_id: String,
    title: String,
    class_level: String,
    subject: String,
    start_time: Option<DateTime<Utc>>,
    messages: Json<Vec<QAPair>>,
}

impl ChatSessionRecord {
    fn to_domain(self) -> ChatSession {
        ChatSession {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            messages: self.messages.0,
            class_level: self.class_level,
            subject: self.subject,
            // Missing timestamps sort after every real session.
            start_time: self.start_time.unwrap_or_else(missing_start_time),
        }
    }
}

#[derive(FromRow)]
struct UserRecord {
    uid: String,
    email: Option<String>,
    display_name: Option<String>,
    photo_url: Option<String>,
    token_balance: i64,
}

impl UserRecord {
    fn to_domain(self) -> UserProfile {
        UserProfile {
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            photo_url: self.photo_url,
            token_balance: self.token_balance,
        }
    }
}

//=========================================================================================
// `ChatStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl ChatStore for DbAdapter {
    async fn save_session(&self, session: &ChatSession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO chats (id, user_id, title, class_level, subject, start_time, messages) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (id) DO UPDATE SET \
                 user_id = EXCLUDED.user_id, \
                 title = EXCLUDED.title, \
                 class_level = EXCLUDED.class_level, \
                 subject = EXCLUDED.subject, \
                 start_time = EXCLUDED.start_time, \
                 messages = EXCLUDED.messages",
        )
        .bind(&session.id)
        .bind(&session.user_id)
        .bind(&session.title)
        .bind(&session.class_level)
        .bind(&session.subject)
        .bind(session.start_time)
        .bind(Json(&session.messages))
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> PortResult<ChatSession> {
        let record = sqlx::query_as::<_, ChatSessionRecord>(
            "SELECT id, user_id, title, class_level, subject, start_time, messages \
             FROM chats WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Chat session {} not found", session_id))
            }
            _ => unexpected(e),
        })?;
        Ok(record.to_domain())
    }

    async fn get_sessions_for_user(&self, user_id: &str) -> PortResult<Vec<ChatSession>> {
        // No ORDER BY on purpose: this query shape has no server-side
        // ordering guarantee, the caller sorts.
        let records = sqlx::query_as::<_, ChatSessionRecord>(
            "SELECT id, user_id, title, class_level, subject, start_time, messages \
             FROM chats WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(unexpected)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }

    async fn delete_session(&self, session_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: &str) -> PortResult<()> {
        // A single statement: all matching documents go, or none do.
        sqlx::query("DELETE FROM chats WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// `TokenLedger` Trait Implementation
//=========================================================================================

#[async_trait]
impl TokenLedger for DbAdapter {
    async fn get_or_create_profile(&self, identity: &IdentitySnapshot) -> PortResult<UserProfile> {
        sqlx::query(
            "INSERT INTO users (uid, email, display_name, photo_url, token_balance) \
             VALUES ($1, $2, $3, $4, $5) ON CONFLICT (uid) DO NOTHING",
        )
        .bind(&identity.uid)
        .bind(&identity.email)
        .bind(&identity.display_name)
        .bind(&identity.photo_url)
        .bind(self.starting_grant)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;

        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT uid, email, display_name, photo_url, token_balance FROM users WHERE uid = $1",
        )
        .bind(&identity.uid)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("User {} not found", identity.uid))
            }
            _ => unexpected(e),
        })?;

        Ok(record.to_domain())
    }

    async fn spend_token(&self, user_id: &str) -> PortResult<i64> {
        // The balance guard is part of the UPDATE itself, so two concurrent
        // spends can never both read a stale positive balance and drive it
        // negative.
        let new_balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET token_balance = token_balance - 1 \
             WHERE uid = $1 AND token_balance >= 1 \
             RETURNING token_balance",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?;

        match new_balance {
            Some(balance) => Ok(balance),
            None => {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM users WHERE uid = $1)",
                )
                .bind(user_id)
                .fetch_one(&self.pool)
                .await
                .map_err(unexpected)?;
                if exists {
                    Err(PortError::InsufficientBalance)
                } else {
                    Err(PortError::NotFound(format!("User {} not found", user_id)))
                }
            }
        }
    }

    async fn credit_order(
        &self,
        order_id: &str,
        user_id: &str,
        amount: i64,
    ) -> PortResult<CreditOutcome> {
        let mut tx = self.pool.begin().await.map_err(unexpected)?;

        // Claim the order id and credit in one transaction: a replayed
        // webhook delivery finds the id already claimed, a failed credit
        // releases the claim for the gateway's retry.
        let claimed = sqlx::query(
            "INSERT INTO processed_orders (order_id, user_id, tokens) \
             VALUES ($1, $2, $3) ON CONFLICT (order_id) DO NOTHING",
        )
        .bind(order_id)
        .bind(user_id)
        .bind(amount)
        .execute(&mut *tx)
        .await
        .map_err(unexpected)?;

        if claimed.rows_affected() == 0 {
            tx.rollback().await.map_err(unexpected)?;
            return Ok(CreditOutcome::AlreadyProcessed);
        }

        let new_balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET token_balance = token_balance + $2 \
             WHERE uid = $1 RETURNING token_balance",
        )
        .bind(user_id)
        .bind(amount)
        .fetch_optional(&mut *tx)
        .await
        .map_err(unexpected)?;

        match new_balance {
            Some(balance) => {
                tx.commit().await.map_err(unexpected)?;
                Ok(CreditOutcome::Credited {
                    new_balance: balance,
                })
            }
            None => {
                tx.rollback().await.map_err(unexpected)?;
                Err(PortError::NotFound(format!("User {} not found", user_id)))
            }
        }
    }

    async fn delete_profile(&self, user_id: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM users WHERE uid = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}
