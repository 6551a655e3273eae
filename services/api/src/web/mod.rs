pub mod ask_task;
pub mod middleware;
pub mod payment;
pub mod rest;
pub mod state;

// Re-export the pieces the server binary wires together.
pub use middleware::require_user;
pub use rest::{
    ask_handler, clear_history_handler, default_prompts_handler, delete_profile_handler,
    delete_session_handler, generate_prompts_handler, get_session_handler, list_history_handler,
    profile_handler,
};
pub use payment::{checkout_handler, payment_notification_handler};
