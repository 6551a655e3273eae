//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use pintarai_core::ports::{
    AnswerService, PaymentGateway, PromptSuggestionService, TokenLedger,
};
use pintarai_core::session::SessionStore;
use std::sync::Arc;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionStore,
    pub ledger: Arc<dyn TokenLedger>,
    pub config: Arc<Config>,
    pub answer_adapter: Arc<dyn AnswerService>,
    pub prompt_adapter: Arc<dyn PromptSuggestionService>,
    pub payment_gateway: Arc<dyn PaymentGateway>,
}
