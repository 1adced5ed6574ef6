//! Invitation code repository.

use chrono::{DateTime, Utc};
use domain::models::InvitationCode;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::InvitationCodeEntity;
use crate::metrics::QueryTimer;

/// Repository for group invitation codes.
pub struct InvitationRepository;

impl InvitationRepository {
    pub async fn insert(
        conn: &mut PgConnection,
        invitation: &InvitationCode,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_invitation_code");
        let result = sqlx::query(
            r#"
            INSERT INTO invitation_codes (id, code, issuer_id, group_id, is_active, expires_at, created_at, used_by, used_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(invitation.id)
        .bind(&invitation.code)
        .bind(invitation.issuer_id)
        .bind(invitation.group_id)
        .bind(invitation.is_active)
        .bind(invitation.expires_at)
        .bind(invitation.created_at)
        .bind(invitation.used_by)
        .bind(invitation.used_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_active_by_code(
        conn: &mut PgConnection,
        code: &str,
    ) -> Result<Option<InvitationCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_invitation_by_code");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(
            r#"
            SELECT id, code, issuer_id, group_id, is_active, expires_at, created_at, used_by, used_at
            FROM invitation_codes
            WHERE code = $1 AND is_active = true
            "#,
        )
        .bind(code)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn deactivate_for_issuer(
        conn: &mut PgConnection,
        issuer_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_invitations_for_issuer");
        let result = sqlx::query(
            "UPDATE invitation_codes SET is_active = false WHERE issuer_id = $1 AND is_active = true",
        )
        .bind(issuer_id)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }

    pub async fn deactivate_for_group(
        conn: &mut PgConnection,
        group_id: Uuid,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_invitations_for_group");
        let result = sqlx::query(
            "UPDATE invitation_codes SET is_active = false WHERE group_id = $1 AND is_active = true",
        )
        .bind(group_id)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }

    /// Flips an active, unexpired code to used in one statement. Concurrent
    /// consumers of the same code see zero rows.
    pub async fn consume(
        conn: &mut PgConnection,
        code: &str,
        user_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Option<InvitationCodeEntity>, sqlx::Error> {
        let timer = QueryTimer::new("consume_invitation_code");
        let result = sqlx::query_as::<_, InvitationCodeEntity>(
            r#"
            UPDATE invitation_codes
            SET is_active = false, used_by = $2, used_at = $3
            WHERE code = $1 AND is_active = true AND expires_at > $3
            RETURNING id, code, issuer_id, group_id, is_active, expires_at, created_at, used_by, used_at
            "#,
        )
        .bind(code)
        .bind(user_id)
        .bind(at)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }
}
