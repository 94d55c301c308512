//! services/api/src/web/check_task.rs
//!
//! The asynchronous worker functions behind the two request boundaries:
//! the check pipeline (authorize, scan, call out, validate, merge,
//! persist) and the reconciliation flow (transition a correction, rebuild
//! the derived text, persist both together).

use crate::web::state::AppState;
use chrono::Utc;
use redpen_core::domain::{
    CheckSession, CorrectionStatus, CreditTransaction, TransactionKind,
};
use redpen_core::ports::PortError;
use redpen_core::{credits, merge, reconcile, rules, tokens, validate};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

/// How a check or reconciliation request fails. Maps onto the service's
/// error taxonomy; the REST layer translates variants to status codes.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    #[error("{0}")]
    Validation(String),
    #[error("insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },
    #[error("model {model} is not available on the {plan} plan")]
    ModelNotAllowed { model: String, plan: String },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("persistence failure: {0}")]
    Persistence(String),
}

fn persistence(e: PortError) -> CheckError {
    match e {
        PortError::NotFound(what) => CheckError::NotFound(what),
        other => CheckError::Persistence(other.to_string()),
    }
}

/// The result of a successful check: the persisted session, plus whether
/// the pipeline fell back to rule-engine-only output.
#[derive(Debug)]
pub struct CheckOutcome {
    pub session: CheckSession,
    pub degraded: bool,
}

/// Runs one full check request.
///
/// The authorization gates run before the external call is issued; failing
/// either short-circuits the pipeline with no external call and no session.
/// A provider failure downgrades the result to rule-engine output and the
/// request still succeeds. A failure persisting the session is fatal for
/// the request. Credit deduction is dispatched in the background and never
/// affects the response.
pub async fn run_check(
    state: Arc<AppState>,
    account_id: Uuid,
    text: String,
    model_name: &str,
) -> Result<CheckOutcome, CheckError> {
    if text.trim().is_empty() {
        return Err(CheckError::Validation("Text is required".to_string()));
    }

    let profile = state
        .models
        .get(model_name)
        .ok_or_else(|| CheckError::Validation(format!("Unknown model: {}", model_name)))?;

    state
        .credits
        .ensure_account(account_id)
        .await
        .map_err(persistence)?;

    let plan = state
        .credits
        .plan_for_account(account_id)
        .await
        .map_err(persistence)?;
    if !state.plans.allows_model(&plan, profile.name) {
        return Err(CheckError::ModelNotAllowed {
            model: profile.name.to_string(),
            plan,
        });
    }

    // The estimate is a conservative over-count; the gate is inclusive.
    let balance = state
        .credits
        .get_balance(account_id)
        .await
        .map_err(persistence)?;
    let estimated_tokens = tokens::estimate_check_tokens(&text, profile);
    let required = credits::credits_for_tokens(profile.credits_per_1k_tokens, estimated_tokens);
    if !credits::has_required_credits(&balance, required) {
        return Err(CheckError::InsufficientCredits {
            required,
            available: balance.available(),
        });
    }

    let rule_corrections = rules::run_rules(&text);

    let mut degraded = false;
    let external_corrections = match state.provider.propose_corrections(&text, profile).await {
        Ok(outcome) => {
            let validated = validate::validate_candidates(&text, &outcome.candidates);
            info!(
                "provider returned {} candidates, {} validated",
                outcome.candidates.len(),
                validated.len()
            );
            if outcome.tokens_used > 0 {
                tokio::spawn(deduct_usage(
                    state.clone(),
                    account_id,
                    profile.name,
                    profile.credits_per_1k_tokens,
                    outcome.tokens_used,
                ));
            }
            validated
        }
        Err(e) => {
            warn!("correction provider failed, degrading to rule-only output: {}", e);
            degraded = true;
            Vec::new()
        }
    };

    let corrections = merge::merge_corrections(rule_corrections, external_corrections);
    let corrected_text = reconcile::apply_accepted(&text, &corrections);

    let session = CheckSession {
        id: Uuid::new_v4(),
        account_id,
        model: profile.name.to_string(),
        original_text: text,
        corrected_text,
        corrections,
        created_at: Utc::now(),
    };

    state
        .sessions
        .create_session(&session)
        .await
        .map_err(|e| CheckError::Persistence(e.to_string()))?;

    Ok(CheckOutcome { session, degraded })
}

/// A fire-and-forget background task settling the bill for one provider
/// call from its ACTUAL token usage. Failures are logged and swallowed:
/// the correction result was already delivered and must not be invalidated
/// by a billing-side fault.
pub(crate) async fn deduct_usage(
    state: Arc<AppState>,
    account_id: Uuid,
    model_name: &'static str,
    credits_per_1k_tokens: u32,
    tokens_used: u64,
) {
    let amount = credits::credits_for_tokens(credits_per_1k_tokens, tokens_used);
    if amount == 0 {
        return;
    }

    let balance = match state.credits.get_balance(account_id).await {
        Ok(balance) => balance,
        Err(e) => {
            error!("credit deduction failed fetching balance for {}: {}", account_id, e);
            return;
        }
    };

    let plan = match credits::plan_deduction(&balance, amount) {
        Ok(plan) => plan,
        Err(e) => {
            error!("credit deduction failed for {}: {}", account_id, e);
            return;
        }
    };

    if let Err(e) = state
        .credits
        .write_balance(account_id, plan.subscription_credits, plan.purchased_credits)
        .await
    {
        error!("credit deduction failed writing balance for {}: {}", account_id, e);
        return;
    }

    let transaction = CreditTransaction {
        id: Uuid::new_v4(),
        account_id,
        kind: TransactionKind::Usage,
        amount,
        reason: format!("{} tokens used on {}", tokens_used, model_name),
        created_at: Utc::now(),
    };
    if let Err(e) = state.credits.record_transaction(&transaction).await {
        error!("failed to record usage transaction for {}: {}", account_id, e);
    }
}

/// Applies one accept/reject action and rebuilds the session's derived
/// text against its immutable original. An unknown correction id is a
/// non-fatal miss: the session round-trips unchanged.
pub async fn run_reconcile(
    state: Arc<AppState>,
    account_id: Uuid,
    session_id: Uuid,
    correction_id: Uuid,
    status: CorrectionStatus,
) -> Result<CheckSession, CheckError> {
    let mut session = state
        .sessions
        .get_session(session_id)
        .await
        .map_err(persistence)?;

    if session.account_id != account_id {
        return Err(CheckError::NotFound(format!("Session {} not found", session_id)));
    }

    if !reconcile::set_correction_status(&mut session.corrections, correction_id, status) {
        info!(
            "reconciliation for session {} ignored unknown correction {}",
            session_id, correction_id
        );
    }

    session.corrected_text =
        reconcile::apply_accepted(&session.original_text, &session.corrections);

    state
        .sessions
        .update_session(session_id, &session.corrections, &session.corrected_text)
        .await
        .map_err(persistence)?;

    Ok(session)
}

//=========================================================================================
// Pipeline Tests (in-memory port fakes)
//=========================================================================================
