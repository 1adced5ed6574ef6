//! Applies validated in-app purchases to the ledger.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{DomainError, DomainResult};
use crate::models::point::PointReason;
use crate::models::purchase::{
    ProductCatalog, ProductGrant, PurchaseOutcome, PurchaseRecord, ValidatedPurchase,
};
use crate::services::ledger;
use crate::store::{MeetupStore, StoreTx};

/// Ledger idempotency key for a store transaction.
pub fn purchase_key(transaction_id: &str) -> String {
    format!("purchase:{}", transaction_id)
}

#[derive(Clone)]
pub struct PurchaseApplier<S: MeetupStore> {
    store: S,
    catalog: Arc<ProductCatalog>,
}

impl<S: MeetupStore> PurchaseApplier<S> {
    pub fn new(store: S, catalog: Arc<ProductCatalog>) -> Self {
        Self { store, catalog }
    }

    /// Applies a purchase exactly once per transaction id.
    pub async fn apply(&self, purchase: &ValidatedPurchase) -> DomainResult<PurchaseOutcome> {
        if purchase.transaction_id.trim().is_empty() {
            return Err(DomainError::Validation(
                "Transaction id must not be empty".into(),
            ));
        }
        let grant = self
            .catalog
            .lookup(&purchase.product_id)
            .ok_or_else(|| DomainError::UnknownProduct(purchase.product_id.clone()))?;

        let now = Utc::now();
        let mut tx = self.store.begin().await?;

        if let Some(existing) = tx.find_purchase(&purchase.transaction_id).await? {
            debug!(
                transaction_id = %existing.transaction_id,
                "Purchase already applied"
            );
            return Ok(PurchaseOutcome::AlreadyApplied);
        }

        let record = PurchaseRecord {
            id: Uuid::new_v4(),
            transaction_id: purchase.transaction_id.clone(),
            product_id: purchase.product_id.clone(),
            platform: purchase.platform,
            user_id: purchase.user_id,
            created_at: now,
        };
        if let Err(e) = tx.insert_purchase(&record).await {
            let e = DomainError::from(e);
            if !e.is_unique_violation() {
                return Err(e);
            }
            drop(tx);
            return self.reread(&purchase.transaction_id).await;
        }

        match grant {
            ProductGrant::Points { .. } => {
                ledger::credit(
                    &mut tx,
                    purchase.user_id,
                    grant.face_value(),
                    PointReason::Purchase,
                    &purchase_key(&purchase.transaction_id),
                    now,
                )
                .await?;
            }
            ProductGrant::FreePass { hours } => {
                ledger::grant_free_pass(&mut tx, purchase.user_id, Duration::hours(hours), now)
                    .await?;
            }
        }

        if let Err(e) = tx.commit().await {
            let e = DomainError::from(e);
            if !e.is_unique_violation() {
                return Err(e);
            }
            return self.reread(&purchase.transaction_id).await;
        }

        info!(
            transaction_id = %purchase.transaction_id,
            product_id = %purchase.product_id,
            platform = %purchase.platform,
            user_id = %purchase.user_id,
            "Purchase applied"
        );
        Ok(PurchaseOutcome::Applied { grant })
    }

    /// Another delivery of the same transaction committed first.
    async fn reread(&self, transaction_id: &str) -> DomainResult<PurchaseOutcome> {
        let mut tx = self.store.begin().await?;
        match tx.find_purchase(transaction_id).await? {
            Some(_) => Ok(PurchaseOutcome::AlreadyApplied),
            None => Err(DomainError::Conflict(format!(
                "Purchase {} raced and did not land",
                transaction_id
            ))),
        }
    }
}
