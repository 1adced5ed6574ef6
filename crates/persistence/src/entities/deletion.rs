//! Deletion schedule entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::deletion::{DeletionSchedule, DeletionStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for deletion_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "deletion_status", rename_all = "lowercase")]
pub enum DeletionStatusDb {
    Waiting,
    Completed,
    Canceled,
}

impl From<DeletionStatusDb> for DeletionStatus {
    fn from(db: DeletionStatusDb) -> Self {
        match db {
            DeletionStatusDb::Waiting => DeletionStatus::Waiting,
            DeletionStatusDb::Completed => DeletionStatus::Completed,
            DeletionStatusDb::Canceled => DeletionStatus::Canceled,
        }
    }
}

impl From<DeletionStatus> for DeletionStatusDb {
    fn from(status: DeletionStatus) -> Self {
        match status {
            DeletionStatus::Waiting => DeletionStatusDb::Waiting,
            DeletionStatus::Completed => DeletionStatusDb::Completed,
            DeletionStatus::Canceled => DeletionStatusDb::Canceled,
        }
    }
}

/// Database row mapping for the deletion_schedules table.
#[derive(Debug, Clone, FromRow)]
pub struct DeletionScheduleEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub reason: Option<String>,
    pub scheduled_at: DateTime<Utc>,
    pub status: DeletionStatusDb,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl From<DeletionScheduleEntity> for DeletionSchedule {
    fn from(entity: DeletionScheduleEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            reason: entity.reason,
            scheduled_at: entity.scheduled_at,
            status: entity.status.into(),
            created_at: entity.created_at,
            completed_at: entity.completed_at,
        }
    }
}
