pub mod credits;
pub mod domain;
pub mod extract;
pub mod merge;
pub mod models;
pub mod ports;
pub mod reconcile;
pub mod rules;
pub mod tokens;
pub mod validate;

pub use domain::{
    CheckSession, Correction, CorrectionKind, CorrectionStatus, CreditBalance, CreditTransaction,
    TransactionKind,
};
pub use models::{ModelCatalog, ModelProfile, Plan, PlanCatalog};
pub use ports::{CorrectionProvider, CreditStore, PortError, PortResult, ProviderOutcome, SessionStore};
