//! User entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub phone_number: String,
    pub point_balance: i64,
    pub free_pass_until: Option<DateTime<Utc>>,
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl From<UserEntity> for domain::models::User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            phone_number: entity.phone_number,
            point_balance: entity.point_balance,
            free_pass_until: entity.free_pass_until,
            is_deleted: entity.is_deleted,
            created_at: entity.created_at,
            deleted_at: entity.deleted_at,
        }
    }
}
