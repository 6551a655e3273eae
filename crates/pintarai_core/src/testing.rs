//! crates/pintarai_core/src/testing.rs
//!
//! An in-memory implementation of the storage ports, used by the core and
//! api test suites. It mirrors the semantics the PostgreSQL adapter must
//! provide: merge upserts, equality-filtered listing without ordering, the
//! guarded token decrement, and the processed-order set.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{ChatSession, IdentitySnapshot, UserProfile};
use crate::ports::{ChatStore, CreditOutcome, PortError, PortResult, TokenLedger};

#[derive(Default)]
struct Inner {
    chats: HashMap<String, ChatSession>,
    users: HashMap<String, UserProfile>,
    processed_orders: HashSet<String>,
}

/// In-memory `ChatStore` + `TokenLedger`.
pub struct MemoryStore {
    inner: Mutex<Inner>,
    starting_grant: i64,
    save_calls: AtomicUsize,
}

impl MemoryStore {
    pub fn new(starting_grant: i64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            starting_grant,
            save_calls: AtomicUsize::new(0),
        }
    }

    /// Number of remote session writes observed. Lets tests assert that an
    /// operation produced no write at all, not merely no visible document.
    pub fn save_calls(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Test seam: set a user's balance directly.
    pub fn set_balance(&self, user_id: &str, balance: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .users
            .entry(user_id.to_string())
            .or_insert_with(|| UserProfile {
                uid: user_id.to_string(),
                email: None,
                display_name: None,
                photo_url: None,
                token_balance: 0,
            })
            .token_balance = balance;
    }

    pub fn balance(&self, user_id: &str) -> Option<i64> {
        let inner = self.inner.lock().unwrap();
        inner.users.get(user_id).map(|u| u.token_balance)
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn save_session(&self, session: &ChatSession) -> PortResult<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        let mut inner = self.inner.lock().unwrap();
        inner.chats.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get_session(&self, session_id: &str) -> PortResult<ChatSession> {
        let inner = self.inner.lock().unwrap();
        inner
            .chats
            .get(session_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Chat session {session_id} not found")))
    }

    async fn get_sessions_for_user(&self, user_id: &str) -> PortResult<Vec<ChatSession>> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .chats
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_session(&self, session_id: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.chats.remove(session_id);
        Ok(())
    }

    async fn delete_sessions_for_user(&self, user_id: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.chats.retain(|_, s| s.user_id != user_id);
        Ok(())
    }
}

#[async_trait]
impl TokenLedger for MemoryStore {
    async fn get_or_create_profile(&self, identity: &IdentitySnapshot) -> PortResult<UserProfile> {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .users
            .entry(identity.uid.clone())
            .or_insert_with(|| UserProfile {
                uid: identity.uid.clone(),
                email: identity.email.clone(),
                display_name: identity.display_name.clone(),
                photo_url: identity.photo_url.clone(),
                token_balance: self.starting_grant,
            });
        Ok(profile.clone())
    }

    async fn spend_token(&self, user_id: &str) -> PortResult<i64> {
        let mut inner = self.inner.lock().unwrap();
        let profile = inner
            .users
            .get_mut(user_id)
            .ok_or_else(|| PortError::NotFound(format!("User {user_id} not found")))?;
        // The guard is re-checked under the lock, at write time.
        if profile.token_balance < 1 {
            return Err(PortError::InsufficientBalance);
        }
        profile.token_balance -= 1;
        Ok(profile.token_balance)
    }

    async fn credit_order(
        &self,
        order_id: &str,
        user_id: &str,
        amount: i64,
    ) -> PortResult<CreditOutcome> {
        let mut inner = self.inner.lock().unwrap();
        if inner.processed_orders.contains(order_id) {
            return Ok(CreditOutcome::AlreadyProcessed);
        }
        // Nothing is marked processed unless the credit itself lands, so a
        // failed delivery can be retried by the gateway.
        if !inner.users.contains_key(user_id) {
            return Err(PortError::NotFound(format!("User {user_id} not found")));
        }
        inner.processed_orders.insert(order_id.to_string());
        let profile = inner.users.get_mut(user_id).expect("checked above");
        profile.token_balance += amount;
        Ok(CreditOutcome::Credited {
            new_balance: profile.token_balance,
        })
    }

    async fn delete_profile(&self, user_id: &str) -> PortResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.users.remove(user_id);
        Ok(())
    }
}
