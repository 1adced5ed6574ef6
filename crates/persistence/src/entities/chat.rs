//! Chat channel binding and orphan channel entities (database row mappings).

use chrono::{DateTime, Utc};
use domain::models::chat::{ChatChannelBinding, OrphanChannel};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the chat_channel_bindings table.
#[derive(Debug, Clone, FromRow)]
pub struct ChatChannelBindingEntity {
    pub id: Uuid,
    pub channel_id: String,
    pub channel_cid: String,
    pub channel_type: String,
    pub match_request_id: Uuid,
    pub group_id: Uuid,
    pub group_member_id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<ChatChannelBindingEntity> for ChatChannelBinding {
    fn from(entity: ChatChannelBindingEntity) -> Self {
        Self {
            id: entity.id,
            channel_id: entity.channel_id,
            channel_cid: entity.channel_cid,
            channel_type: entity.channel_type,
            match_request_id: entity.match_request_id,
            group_id: entity.group_id,
            group_member_id: entity.group_member_id,
            user_id: entity.user_id,
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the orphan_channels table.
#[derive(Debug, Clone, FromRow)]
pub struct OrphanChannelEntity {
    pub id: Uuid,
    pub channel_cid: String,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<OrphanChannelEntity> for OrphanChannel {
    fn from(entity: OrphanChannelEntity) -> Self {
        Self {
            id: entity.id,
            channel_cid: entity.channel_cid,
            reason: entity.reason,
            recorded_at: entity.recorded_at,
            resolved_at: entity.resolved_at,
        }
    }
}
