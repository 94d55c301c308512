//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use redpen_core::models::{ModelCatalog, PlanCatalog};
use redpen_core::ports::{CorrectionProvider, CreditStore, SessionStore};
use std::sync::Arc;

/// The shared application state, created once at startup and passed to all
/// handlers. The catalogs are immutable configuration maps; the ports hide
/// the concrete database and provider adapters.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionStore>,
    pub credits: Arc<dyn CreditStore>,
    pub provider: Arc<dyn CorrectionProvider>,
    pub models: ModelCatalog,
    pub plans: PlanCatalog,
    pub config: Arc<Config>,
}
