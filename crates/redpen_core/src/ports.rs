//! crates/redpen_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to be independent of specific external implementations like databases
//! or generative-text APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{CheckSession, Correction, CreditBalance, CreditTransaction};
use crate::models::ModelProfile;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
///
/// The variants line up with the request-level error taxonomy: `Provider`
/// failures degrade a check to rule-only output, `Storage` failures on the
/// primary session write abort the request, `Storage` failures on the
/// deduction path are logged and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("External service error: {0}")]
    Provider(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Unauthorized")]
    Unauthorized,
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Persistence for check sessions. Sessions are created once, mutated only
/// through reconciliation, and never deleted.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self, session: &CheckSession) -> PortResult<()>;

    async fn get_session(&self, session_id: Uuid) -> PortResult<CheckSession>;

    /// Persists the updated correction set and derived text together as the
    /// new canonical session state.
    async fn update_session(
        &self,
        session_id: Uuid,
        corrections: &[Correction],
        corrected_text: &str,
    ) -> PortResult<()>;

    /// A caller's past sessions, newest first.
    async fn sessions_for_account(&self, account_id: Uuid) -> PortResult<Vec<CheckSession>>;
}

/// Persistence for the per-account credit pools and the append-only
/// transaction log. Correctness of the increments relies on the backing
/// store providing atomic per-row updates.
#[async_trait]
pub trait CreditStore: Send + Sync {
    /// Get-or-create provisioning: seeds a fresh account with the free plan
    /// and its monthly allotment.
    async fn ensure_account(&self, account_id: Uuid) -> PortResult<()>;

    async fn plan_for_account(&self, account_id: Uuid) -> PortResult<String>;

    async fn set_plan(&self, account_id: Uuid, plan_id: &str) -> PortResult<()>;

    async fn get_balance(&self, account_id: Uuid) -> PortResult<CreditBalance>;

    /// Writes both pool fields together in one statement. Used by the
    /// deduction path after the split has been planned in memory; never
    /// performs a partial write.
    async fn write_balance(
        &self,
        account_id: Uuid,
        subscription_credits: i64,
        purchased_credits: i64,
    ) -> PortResult<()>;

    /// Atomic increment of the subscription pool, stamping `last_reset`.
    async fn add_subscription_credits(&self, account_id: Uuid, amount: i64) -> PortResult<()>;

    /// Atomic increment of the purchased pool.
    async fn add_purchased_credits(&self, account_id: Uuid, amount: i64) -> PortResult<()>;

    async fn record_transaction(&self, transaction: &CreditTransaction) -> PortResult<()>;
}

/// What the external generative service returned for one call: the raw,
/// untrusted correction candidates and the actual token usage it reported.
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub candidates: Vec<serde_json::Value>,
    pub tokens_used: u64,
}

/// The untrusted external generative source of correction candidates.
#[async_trait]
pub trait CorrectionProvider: Send + Sync {
    /// Requests correction candidates for `text` from the given model.
    ///
    /// A failed call or unparseable response is an error for this call only;
    /// the pipeline degrades to rule-engine output.
    async fn propose_corrections(
        &self,
        text: &str,
        profile: &ModelProfile,
    ) -> PortResult<ProviderOutcome>;
}
