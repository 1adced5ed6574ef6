//! Point ledger.
//!
//! The free functions run inside a caller-owned transaction so a debit commits
//! or rolls back together with the action it pays for. [`LedgerService`] wraps
//! them for standalone use.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::point::{
    CreditOutcome, LedgerEntryKind, PointConsumption, PointReason, PointStatement,
};
use crate::models::user::User;
use crate::store::{MeetupStore, StoreTx};

async fn lock_live_user<T: StoreTx>(tx: &mut T, user_id: Uuid) -> DomainResult<User> {
    let user = tx
        .lock_user(user_id)
        .await?
        .ok_or_else(|| DomainError::not_found("User", user_id))?;
    if user.is_deleted {
        return Err(DomainError::UserDeleted(user_id));
    }
    Ok(user)
}

fn entry(
    user_id: Uuid,
    kind: LedgerEntryKind,
    amount: i64,
    reason: PointReason,
    idempotency_key: Option<String>,
    now: DateTime<Utc>,
) -> PointConsumption {
    PointConsumption {
        id: Uuid::new_v4(),
        user_id,
        kind,
        amount,
        reason,
        idempotency_key,
        created_at: now,
    }
}

/// Removes `amount` points from the user and appends a DEBIT row.
///
/// Returns the new balance.
pub async fn debit<T: StoreTx>(
    tx: &mut T,
    user_id: Uuid,
    amount: i64,
    reason: PointReason,
    now: DateTime<Utc>,
) -> DomainResult<i64> {
    if amount <= 0 {
        return Err(DomainError::Validation(
            "Debit amount must be positive".into(),
        ));
    }

    let user = lock_live_user(tx, user_id).await?;
    if user.point_balance < amount {
        return Err(DomainError::InsufficientBalance {
            required: amount,
            available: user.point_balance,
        });
    }

    let balance = user.point_balance - amount;
    tx.update_user_balance(user_id, balance).await?;
    tx.insert_ledger_entry(&entry(
        user_id,
        LedgerEntryKind::Debit,
        amount,
        reason,
        None,
        now,
    ))
    .await?;

    debug!(user_id = %user_id, amount, balance, reason = %reason, "Points debited");
    Ok(balance)
}

/// Adds `amount` points once per `idempotency_key`.
pub async fn credit<T: StoreTx>(
    tx: &mut T,
    user_id: Uuid,
    amount: i64,
    reason: PointReason,
    idempotency_key: &str,
    now: DateTime<Utc>,
) -> DomainResult<CreditOutcome> {
    if amount <= 0 {
        return Err(DomainError::Validation(
            "Credit amount must be positive".into(),
        ));
    }

    let user = lock_live_user(tx, user_id).await?;
    if tx
        .find_ledger_entry_by_key(idempotency_key)
        .await?
        .is_some()
    {
        debug!(user_id = %user_id, key = %idempotency_key, "Credit already applied");
        return Ok(CreditOutcome::AlreadyApplied {
            balance: user.point_balance,
        });
    }

    let balance = user.point_balance + amount;
    tx.update_user_balance(user_id, balance).await?;
    tx.insert_ledger_entry(&entry(
        user_id,
        LedgerEntryKind::Credit,
        amount,
        reason,
        Some(idempotency_key.to_string()),
        now,
    ))
    .await?;

    info!(user_id = %user_id, amount, balance, reason = %reason, "Points credited");
    Ok(CreditOutcome::Applied { balance })
}

/// Extends the free pass to `max(now, current expiry) + duration`.
pub async fn grant_free_pass<T: StoreTx>(
    tx: &mut T,
    user_id: Uuid,
    duration: Duration,
    now: DateTime<Utc>,
) -> DomainResult<DateTime<Utc>> {
    let user = lock_live_user(tx, user_id).await?;
    let base = user.free_pass_until.map_or(now, |until| until.max(now));
    let until = base + duration;
    tx.update_free_pass(user_id, until).await?;

    info!(user_id = %user_id, until = %until, "Free pass granted");
    Ok(until)
}

/// Standalone ledger operations, each in its own transaction.
#[derive(Clone)]
pub struct LedgerService<S: MeetupStore> {
    store: S,
}

impl<S: MeetupStore> LedgerService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn debit(&self, user_id: Uuid, amount: i64, reason: PointReason) -> DomainResult<i64> {
        let mut tx = self.store.begin().await?;
        let balance = debit(&mut tx, user_id, amount, reason, Utc::now()).await?;
        tx.commit().await?;
        Ok(balance)
    }

    pub async fn credit(
        &self,
        user_id: Uuid,
        amount: i64,
        reason: PointReason,
        idempotency_key: &str,
    ) -> DomainResult<CreditOutcome> {
        let mut tx = self.store.begin().await?;
        let result = credit(&mut tx, user_id, amount, reason, idempotency_key, Utc::now()).await;
        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_unique_violation() => {
                drop(tx);
                return self.reread_credit(user_id).await;
            }
            Err(e) => return Err(e),
        };
        match tx.commit().await {
            Ok(()) => Ok(outcome),
            Err(e) => {
                let e = DomainError::from(e);
                if e.is_unique_violation() {
                    self.reread_credit(user_id).await
                } else {
                    Err(e)
                }
            }
        }
    }

    /// A concurrent credit with the same key won the race; report its result.
    async fn reread_credit(&self, user_id: Uuid) -> DomainResult<CreditOutcome> {
        let balance = self.balance(user_id).await?;
        Ok(CreditOutcome::AlreadyApplied { balance })
    }

    pub async fn grant_free_pass(
        &self,
        user_id: Uuid,
        duration: Duration,
    ) -> DomainResult<DateTime<Utc>> {
        let mut tx = self.store.begin().await?;
        let until = grant_free_pass(&mut tx, user_id, duration, Utc::now()).await?;
        tx.commit().await?;
        Ok(until)
    }

    pub async fn balance(&self, user_id: Uuid) -> DomainResult<i64> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;
        Ok(user.point_balance)
    }

    pub async fn statement(&self, user_id: Uuid) -> DomainResult<PointStatement> {
        let mut tx = self.store.begin().await?;
        let user = tx
            .find_user(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;
        let history = tx.list_ledger_entries(user_id).await?;
        Ok(PointStatement {
            balance: user.point_balance,
            free_pass_until: user.free_pass_until,
            history,
        })
    }
}
