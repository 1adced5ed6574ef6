//! Group and group member entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::group::{Group, GroupMember};
use domain::models::hotplace::GeoPoint;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the groups table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupEntity {
    pub id: Uuid,
    pub hotplace_id: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
    pub introduction: Option<String>,
    pub meetup_starts_at: DateTime<Utc>,
    pub meetup_ends_at: DateTime<Utc>,
    pub match_cost: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<GroupEntity> for Group {
    fn from(entity: GroupEntity) -> Self {
        Self {
            id: entity.id,
            hotplace_id: entity.hotplace_id,
            location: GeoPoint::new(entity.latitude, entity.longitude),
            title: entity.title,
            introduction: entity.introduction,
            meetup_starts_at: entity.meetup_starts_at,
            meetup_ends_at: entity.meetup_ends_at,
            match_cost: entity.match_cost,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the group_members table.
#[derive(Debug, Clone, FromRow)]
pub struct GroupMemberEntity {
    pub id: Uuid,
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub is_leader: bool,
    pub is_active: bool,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
}

impl From<GroupMemberEntity> for GroupMember {
    fn from(entity: GroupMemberEntity) -> Self {
        Self {
            id: entity.id,
            group_id: entity.group_id,
            user_id: entity.user_id,
            is_leader: entity.is_leader,
            is_active: entity.is_active,
            joined_at: entity.joined_at,
            left_at: entity.left_at,
        }
    }
}
