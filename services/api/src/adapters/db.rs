//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete
//! implementation of the `SessionStore` and `CreditStore` ports from the
//! `core` crate. It handles all interactions with the PostgreSQL database
//! using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redpen_core::domain::{CheckSession, Correction, CreditBalance, CreditTransaction};
use redpen_core::models::PlanCatalog;
use redpen_core::ports::{CreditStore, PortError, PortResult, SessionStore};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the store ports.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    plans: PlanCatalog,
}

impl PgStore {
    /// Creates a new `PgStore`.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            plans: PlanCatalog::new(),
        }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn storage_err(e: sqlx::Error) -> PortError {
    PortError::Storage(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct SessionRecord {
    id: Uuid,
    account_id: Uuid,
    model: String,
    original_text: String,
    corrected_text: String,
    corrections: Json<Vec<Correction>>,
    created_at: DateTime<Utc>,
}

impl SessionRecord {
    fn to_domain(self) -> CheckSession {
        CheckSession {
            id: self.id,
            account_id: self.account_id,
            model: self.model,
            original_text: self.original_text,
            corrected_text: self.corrected_text,
            corrections: self.corrections.0,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct BalanceRecord {
    account_id: Uuid,
    subscription_credits: i64,
    purchased_credits: i64,
    last_reset: DateTime<Utc>,
}

impl BalanceRecord {
    fn to_domain(self) -> CreditBalance {
        CreditBalance {
            account_id: self.account_id,
            subscription_credits: self.subscription_credits,
            purchased_credits: self.purchased_credits,
            last_reset: self.last_reset,
        }
    }
}

//=========================================================================================
// `SessionStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(&self, session: &CheckSession) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO check_sessions (id, account_id, model, original_text, corrected_text, corrections, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(session.id)
        .bind(session.account_id)
        .bind(&session.model)
        .bind(&session.original_text)
        .bind(&session.corrected_text)
        .bind(Json(&session.corrections))
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn get_session(&self, session_id: Uuid) -> PortResult<CheckSession> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, account_id, model, original_text, corrected_text, corrections, created_at
             FROM check_sessions WHERE id = $1",
        )
        .bind(session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Session {} not found", session_id))
            }
            _ => storage_err(e),
        })?;
        Ok(record.to_domain())
    }

    async fn update_session(
        &self,
        session_id: Uuid,
        corrections: &[Correction],
        corrected_text: &str,
    ) -> PortResult<()> {
        let result = sqlx::query(
            "UPDATE check_sessions SET corrections = $1, corrected_text = $2 WHERE id = $3",
        )
        .bind(Json(corrections))
        .bind(corrected_text)
        .bind(session_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Session {} not found",
                session_id
            )));
        }
        Ok(())
    }

    async fn sessions_for_account(&self, account_id: Uuid) -> PortResult<Vec<CheckSession>> {
        let records = sqlx::query_as::<_, SessionRecord>(
            "SELECT id, account_id, model, original_text, corrected_text, corrections, created_at
             FROM check_sessions WHERE account_id = $1 ORDER BY created_at DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(records.into_iter().map(|r| r.to_domain()).collect())
    }
}

//=========================================================================================
// `CreditStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CreditStore for PgStore {
    async fn ensure_account(&self, account_id: Uuid) -> PortResult<()> {
        sqlx::query("INSERT INTO accounts (account_id) VALUES ($1) ON CONFLICT (account_id) DO NOTHING")
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        // A fresh account starts on the free plan with its monthly allotment.
        let free_credits = self.plans.get("free").map(|p| p.monthly_credits).unwrap_or(0);
        sqlx::query(
            "INSERT INTO credit_balances (account_id, subscription_credits, purchased_credits)
             VALUES ($1, $2, 0) ON CONFLICT (account_id) DO NOTHING",
        )
        .bind(account_id)
        .bind(free_credits)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn plan_for_account(&self, account_id: Uuid) -> PortResult<String> {
        let plan: (String,) = sqlx::query_as("SELECT plan_id FROM accounts WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Account {} not found", account_id))
                }
                _ => storage_err(e),
            })?;
        Ok(plan.0)
    }

    async fn set_plan(&self, account_id: Uuid, plan_id: &str) -> PortResult<()> {
        let result = sqlx::query("UPDATE accounts SET plan_id = $1 WHERE account_id = $2")
            .bind(plan_id)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Account {} not found",
                account_id
            )));
        }
        Ok(())
    }

    async fn get_balance(&self, account_id: Uuid) -> PortResult<CreditBalance> {
        let record = sqlx::query_as::<_, BalanceRecord>(
            "SELECT account_id, subscription_credits, purchased_credits, last_reset
             FROM credit_balances WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => {
                PortError::NotFound(format!("Balance for account {} not found", account_id))
            }
            _ => storage_err(e),
        })?;
        Ok(record.to_domain())
    }

    async fn write_balance(
        &self,
        account_id: Uuid,
        subscription_credits: i64,
        purchased_credits: i64,
    ) -> PortResult<()> {
        // Both pool fields land in one statement; a deduction is either
        // fully persisted or not at all.
        let result = sqlx::query(
            "UPDATE credit_balances SET subscription_credits = $1, purchased_credits = $2
             WHERE account_id = $3",
        )
        .bind(subscription_credits)
        .bind(purchased_credits)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!(
                "Balance for account {} not found",
                account_id
            )));
        }
        Ok(())
    }

    async fn add_subscription_credits(&self, account_id: Uuid, amount: i64) -> PortResult<()> {
        sqlx::query(
            "UPDATE credit_balances
             SET subscription_credits = subscription_credits + $1, last_reset = now()
             WHERE account_id = $2",
        )
        .bind(amount)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn add_purchased_credits(&self, account_id: Uuid, amount: i64) -> PortResult<()> {
        sqlx::query(
            "UPDATE credit_balances SET purchased_credits = purchased_credits + $1
             WHERE account_id = $2",
        )
        .bind(amount)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }

    async fn record_transaction(&self, transaction: &CreditTransaction) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO credit_transactions (id, account_id, kind, amount, reason, created_at)
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(transaction.id)
        .bind(transaction.account_id)
        .bind(transaction.kind.as_str())
        .bind(transaction.amount)
        .bind(&transaction.reason)
        .bind(transaction.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(())
    }
}
