//! Match request entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::match_request::{MatchRequest, MatchStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for match_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "match_status", rename_all = "lowercase")]
pub enum MatchStatusDb {
    Waiting,
    Accepted,
    Rejected,
    Canceled,
}

impl From<MatchStatusDb> for MatchStatus {
    fn from(db: MatchStatusDb) -> Self {
        match db {
            MatchStatusDb::Waiting => MatchStatus::Waiting,
            MatchStatusDb::Accepted => MatchStatus::Accepted,
            MatchStatusDb::Rejected => MatchStatus::Rejected,
            MatchStatusDb::Canceled => MatchStatus::Canceled,
        }
    }
}

impl From<MatchStatus> for MatchStatusDb {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Waiting => MatchStatusDb::Waiting,
            MatchStatus::Accepted => MatchStatusDb::Accepted,
            MatchStatus::Rejected => MatchStatusDb::Rejected,
            MatchStatus::Canceled => MatchStatusDb::Canceled,
        }
    }
}

/// Database row mapping for the match_requests table.
#[derive(Debug, Clone, FromRow)]
pub struct MatchRequestEntity {
    pub id: Uuid,
    pub sender_group_id: Uuid,
    pub receiver_group_id: Uuid,
    pub status: MatchStatusDb,
    pub is_active: bool,
    pub cost_paid: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MatchRequestEntity> for MatchRequest {
    fn from(entity: MatchRequestEntity) -> Self {
        Self {
            id: entity.id,
            sender_group_id: entity.sender_group_id,
            receiver_group_id: entity.receiver_group_id,
            status: entity.status.into(),
            is_active: entity.is_active,
            cost_paid: entity.cost_paid,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_conversion() {
        assert_eq!(MatchStatus::from(MatchStatusDb::Accepted), MatchStatus::Accepted);
        assert_eq!(MatchStatusDb::from(MatchStatus::Canceled), MatchStatusDb::Canceled);
    }
}
