//! crates/redpen_core/src/credits.rs
//!
//! Credit ledger arithmetic: cost conversion, the authorization gate, and
//! dual-pool deduction planning. Everything here is pure; the store adapter
//! performs the actual row writes.

use crate::domain::CreditBalance;

/// Converts actual token usage into credits: `ceil(tokens / 1000 * rate)`.
/// Any nonzero usage costs at least 1 credit; zero usage costs nothing.
pub fn credits_for_tokens(credits_per_1k_tokens: u32, tokens_used: u64) -> i64 {
    let scaled = tokens_used * u64::from(credits_per_1k_tokens);
    ((scaled + 999) / 1000) as i64
}

/// The pre-call authorization gate: both pools combined must cover the
/// required amount, boundary inclusive.
pub fn has_required_credits(balance: &CreditBalance, required: i64) -> bool {
    balance.available() >= required
}

/// Deduction would drive the purchased pool negative; nothing may be
/// written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not enough credits: {requested} requested, {available} available")]
pub struct InsufficientCredits {
    pub requested: i64,
    pub available: i64,
}

/// The post-deduction pool values to persist together in one write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeductionPlan {
    pub subscription_credits: i64,
    pub purchased_credits: i64,
}

/// Plans a deduction against a local copy of the balance: subscription
/// credits are spent first, clamped at zero; the remainder comes out of
/// purchased credits. If the remainder exceeds the purchased pool the
/// entire deduction fails and nothing is written.
pub fn plan_deduction(
    balance: &CreditBalance,
    amount: i64,
) -> Result<DeductionPlan, InsufficientCredits> {
    let from_subscription = amount.min(balance.subscription_credits);
    let remainder = amount - from_subscription;

    if remainder > balance.purchased_credits {
        return Err(InsufficientCredits {
            requested: amount,
            available: balance.available(),
        });
    }

    Ok(DeductionPlan {
        subscription_credits: balance.subscription_credits - from_subscription,
        purchased_credits: balance.purchased_credits - remainder,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn balance(subscription: i64, purchased: i64) -> CreditBalance {
        CreditBalance {
            account_id: Uuid::new_v4(),
            subscription_credits: subscription,
            purchased_credits: purchased,
            last_reset: Utc::now(),
        }
    }

    #[test]
    fn cost_is_ceiling_of_proportional_rate() {
        // ceil(150 / 1000 * 10) = 2
        assert_eq!(credits_for_tokens(10, 150), 2);
        assert_eq!(credits_for_tokens(10, 100), 1);
        assert_eq!(credits_for_tokens(3, 1000), 3);
    }

    #[test]
    fn nonzero_usage_costs_at_least_one_credit() {
        assert_eq!(credits_for_tokens(2, 1), 1);
        assert_eq!(credits_for_tokens(10, 0), 0);
    }

    #[test]
    fn authorization_boundary_is_inclusive() {
        let b = balance(3, 4);
        assert!(has_required_credits(&b, 7));
        assert!(has_required_credits(&b, 6));
        assert!(!has_required_credits(&b, 8));
    }

    #[test]
    fn deduction_drains_subscription_pool_first() {
        let plan = plan_deduction(&balance(3, 5), 6).unwrap();
        assert_eq!(plan.subscription_credits, 0);
        assert_eq!(plan.purchased_credits, 2);
    }

    #[test]
    fn deduction_within_subscription_pool_leaves_purchased_untouched() {
        let plan = plan_deduction(&balance(10, 5), 4).unwrap();
        assert_eq!(plan.subscription_credits, 6);
        assert_eq!(plan.purchased_credits, 5);
    }

    #[test]
    fn unsatisfiable_deduction_fails_whole() {
        let b = balance(0, 1);
        let err = plan_deduction(&b, 5).unwrap_err();
        assert_eq!(err.requested, 5);
        assert_eq!(err.available, 1);
        // The balance itself is untouched; nothing was planned to write.
        assert_eq!(b.subscription_credits, 0);
        assert_eq!(b.purchased_credits, 1);
    }

    #[test]
    fn exact_drain_of_both_pools_succeeds() {
        let plan = plan_deduction(&balance(3, 5), 8).unwrap();
        assert_eq!(plan.subscription_credits, 0);
        assert_eq!(plan.purchased_credits, 0);
    }
}
