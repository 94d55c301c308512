pub mod check_task;
pub mod rest;
pub mod state;

// Re-export the handlers so the binary that builds the web server router
// can reach them directly.
pub use rest::{
    balance_handler, check_handler, get_session_handler, list_sessions_handler, purchase_handler,
    reconcile_handler, renewal_handler, session_view_handler,
};
