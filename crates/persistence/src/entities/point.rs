//! Point ledger entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::point::{LedgerEntryKind, PointConsumption, PointReason};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for ledger_entry_kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_kind", rename_all = "lowercase")]
pub enum LedgerEntryKindDb {
    Debit,
    Credit,
}

impl From<LedgerEntryKindDb> for LedgerEntryKind {
    fn from(db: LedgerEntryKindDb) -> Self {
        match db {
            LedgerEntryKindDb::Debit => LedgerEntryKind::Debit,
            LedgerEntryKindDb::Credit => LedgerEntryKind::Credit,
        }
    }
}

impl From<LedgerEntryKind> for LedgerEntryKindDb {
    fn from(kind: LedgerEntryKind) -> Self {
        match kind {
            LedgerEntryKind::Debit => LedgerEntryKindDb::Debit,
            LedgerEntryKind::Credit => LedgerEntryKindDb::Credit,
        }
    }
}

/// Database enum for point_reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "point_reason", rename_all = "snake_case")]
pub enum PointReasonDb {
    MatchRequest,
    Purchase,
    SignupBonus,
    Adjustment,
}

impl From<PointReasonDb> for PointReason {
    fn from(db: PointReasonDb) -> Self {
        match db {
            PointReasonDb::MatchRequest => PointReason::MatchRequest,
            PointReasonDb::Purchase => PointReason::Purchase,
            PointReasonDb::SignupBonus => PointReason::SignupBonus,
            PointReasonDb::Adjustment => PointReason::Adjustment,
        }
    }
}

impl From<PointReason> for PointReasonDb {
    fn from(reason: PointReason) -> Self {
        match reason {
            PointReason::MatchRequest => PointReasonDb::MatchRequest,
            PointReason::Purchase => PointReasonDb::Purchase,
            PointReason::SignupBonus => PointReasonDb::SignupBonus,
            PointReason::Adjustment => PointReasonDb::Adjustment,
        }
    }
}

/// Database row mapping for the point_consumptions table.
#[derive(Debug, Clone, FromRow)]
pub struct PointConsumptionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: LedgerEntryKindDb,
    pub amount: i64,
    pub reason: PointReasonDb,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PointConsumptionEntity> for PointConsumption {
    fn from(entity: PointConsumptionEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            kind: entity.kind.into(),
            amount: entity.amount,
            reason: entity.reason.into(),
            idempotency_key: entity.idempotency_key,
            created_at: entity.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_conversion_is_lossless() {
        for reason in [
            PointReason::MatchRequest,
            PointReason::Purchase,
            PointReason::SignupBonus,
            PointReason::Adjustment,
        ] {
            let db: PointReasonDb = reason.into();
            assert_eq!(PointReason::from(db), reason);
        }
    }
}
