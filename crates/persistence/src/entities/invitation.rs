//! Invitation code entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::invitation::InvitationCode;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the invitation_codes table.
#[derive(Debug, Clone, FromRow)]
pub struct InvitationCodeEntity {
    pub id: Uuid,
    pub code: String,
    pub issuer_id: Uuid,
    pub group_id: Uuid,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub used_by: Option<Uuid>,
    pub used_at: Option<DateTime<Utc>>,
}

impl From<InvitationCodeEntity> for InvitationCode {
    fn from(entity: InvitationCodeEntity) -> Self {
        Self {
            id: entity.id,
            code: entity.code,
            issuer_id: entity.issuer_id,
            group_id: entity.group_id,
            is_active: entity.is_active,
            expires_at: entity.expires_at,
            created_at: entity.created_at,
            used_by: entity.used_by,
            used_at: entity.used_at,
        }
    }
}
