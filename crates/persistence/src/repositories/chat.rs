//! Chat channel binding and orphan channel repository.

use chrono::{DateTime, Utc};
use domain::models::{ChatChannelBinding, OrphanChannel};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::{ChatChannelBindingEntity, OrphanChannelEntity};
use crate::metrics::QueryTimer;

/// Repository for local bookkeeping of provider chat channels.
pub struct ChatBindingRepository;

impl ChatBindingRepository {
    pub async fn insert_binding(
        conn: &mut PgConnection,
        binding: &ChatChannelBinding,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_chat_channel_binding");
        let result = sqlx::query(
            r#"
            INSERT INTO chat_channel_bindings (id, channel_id, channel_cid, channel_type, match_request_id,
                                               group_id, group_member_id, user_id, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(binding.id)
        .bind(&binding.channel_id)
        .bind(&binding.channel_cid)
        .bind(&binding.channel_type)
        .bind(binding.match_request_id)
        .bind(binding.group_id)
        .bind(binding.group_member_id)
        .bind(binding.user_id)
        .bind(binding.is_active)
        .bind(binding.created_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Every binding seeded by the request, active or not.
    pub async fn list_for_request(
        conn: &mut PgConnection,
        match_request_id: Uuid,
    ) -> Result<Vec<ChatChannelBindingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_bindings_for_request");
        let result = sqlx::query_as::<_, ChatChannelBindingEntity>(
            r#"
            SELECT id, channel_id, channel_cid, channel_type, match_request_id,
                   group_id, group_member_id, user_id, is_active, created_at
            FROM chat_channel_bindings
            WHERE match_request_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(match_request_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn list_active_for_channel(
        conn: &mut PgConnection,
        channel_cid: &str,
    ) -> Result<Vec<ChatChannelBindingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_bindings_for_channel");
        let result = sqlx::query_as::<_, ChatChannelBindingEntity>(
            r#"
            SELECT id, channel_id, channel_cid, channel_type, match_request_id,
                   group_id, group_member_id, user_id, is_active, created_at
            FROM chat_channel_bindings
            WHERE channel_cid = $1 AND is_active = true
            "#,
        )
        .bind(channel_cid)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn list_active_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<ChatChannelBindingEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_bindings_for_user");
        let result = sqlx::query_as::<_, ChatChannelBindingEntity>(
            r#"
            SELECT id, channel_id, channel_cid, channel_type, match_request_id,
                   group_id, group_member_id, user_id, is_active, created_at
            FROM chat_channel_bindings
            WHERE user_id = $1 AND is_active = true
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn deactivate_for_channel(
        conn: &mut PgConnection,
        channel_cid: &str,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_bindings_for_channel");
        let result = sqlx::query(
            "UPDATE chat_channel_bindings SET is_active = false WHERE channel_cid = $1 AND is_active = true",
        )
        .bind(channel_cid)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }

    pub async fn insert_orphan(
        conn: &mut PgConnection,
        orphan: &OrphanChannel,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_orphan_channel");
        let result = sqlx::query(
            r#"
            INSERT INTO orphan_channels (id, channel_cid, reason, recorded_at, resolved_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(orphan.id)
        .bind(&orphan.channel_cid)
        .bind(&orphan.reason)
        .bind(orphan.recorded_at)
        .bind(orphan.resolved_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Oldest unresolved orphans first.
    pub async fn list_unresolved_orphans(
        conn: &mut PgConnection,
        limit: i64,
    ) -> Result<Vec<OrphanChannelEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_unresolved_orphans");
        let result = sqlx::query_as::<_, OrphanChannelEntity>(
            r#"
            SELECT id, channel_cid, reason, recorded_at, resolved_at
            FROM orphan_channels
            WHERE resolved_at IS NULL
            ORDER BY recorded_at
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn resolve_orphan(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("resolve_orphan_channel");
        let result = sqlx::query(
            "UPDATE orphan_channels SET resolved_at = $2 WHERE id = $1 AND resolved_at IS NULL",
        )
        .bind(id)
        .bind(at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
