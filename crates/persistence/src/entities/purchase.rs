//! Validated purchase entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::purchase::{Platform, PurchaseRecord};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for purchase_platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "purchase_platform", rename_all = "lowercase")]
pub enum PurchasePlatformDb {
    Apple,
    Google,
}

impl From<PurchasePlatformDb> for Platform {
    fn from(db: PurchasePlatformDb) -> Self {
        match db {
            PurchasePlatformDb::Apple => Platform::Apple,
            PurchasePlatformDb::Google => Platform::Google,
        }
    }
}

impl From<Platform> for PurchasePlatformDb {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Apple => PurchasePlatformDb::Apple,
            Platform::Google => PurchasePlatformDb::Google,
        }
    }
}

/// Database row mapping for the validated_purchases table.
#[derive(Debug, Clone, FromRow)]
pub struct PurchaseRecordEntity {
    pub id: Uuid,
    pub transaction_id: String,
    pub product_id: String,
    pub platform: PurchasePlatformDb,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl From<PurchaseRecordEntity> for PurchaseRecord {
    fn from(entity: PurchaseRecordEntity) -> Self {
        Self {
            id: entity.id,
            transaction_id: entity.transaction_id,
            product_id: entity.product_id,
            platform: entity.platform.into(),
            user_id: entity.user_id,
            created_at: entity.created_at,
        }
    }
}
