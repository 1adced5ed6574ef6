//! Match request repository.

use chrono::{DateTime, Utc};
use domain::models::match_request::{ordered_pair, MatchRequest, MatchStatus};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::{MatchRequestEntity, MatchStatusDb};
use crate::metrics::QueryTimer;

/// Repository for match requests between groups.
pub struct MatchRequestRepository;

impl MatchRequestRepository {
    /// Takes a transaction-scoped advisory lock on the unordered pair.
    pub async fn lock_pair(conn: &mut PgConnection, a: Uuid, b: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("lock_match_pair");
        let (low, high) = ordered_pair(a, b);
        let result = sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(format!("match_pair:{}:{}", low, high))
            .execute(&mut *conn)
            .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_open_between(
        conn: &mut PgConnection,
        a: Uuid,
        b: Uuid,
    ) -> Result<Option<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_open_match_request_between");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_group_id, receiver_group_id, status, is_active, cost_paid, created_at, updated_at
            FROM match_requests
            WHERE is_active = true
              AND status IN ('waiting', 'accepted')
              AND ((sender_group_id = $1 AND receiver_group_id = $2)
                OR (sender_group_id = $2 AND receiver_group_id = $1))
            LIMIT 1
            "#,
        )
        .bind(a)
        .bind(b)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn insert(conn: &mut PgConnection, request: &MatchRequest) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_match_request");
        let result = sqlx::query(
            r#"
            INSERT INTO match_requests (id, sender_group_id, receiver_group_id, status, is_active, cost_paid, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(request.id)
        .bind(request.sender_group_id)
        .bind(request.receiver_group_id)
        .bind(MatchStatusDb::from(request.status))
        .bind(request.is_active)
        .bind(request.cost_paid)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_match_request_by_id");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_group_id, receiver_group_id, status, is_active, cost_paid, created_at, updated_at
            FROM match_requests
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_match_request_by_id");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_group_id, receiver_group_id, status, is_active, cost_paid, created_at, updated_at
            FROM match_requests
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn update_status(
        conn: &mut PgConnection,
        id: Uuid,
        status: MatchStatus,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_match_request_status");
        let result = sqlx::query("UPDATE match_requests SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(MatchStatusDb::from(status))
            .bind(at)
            .execute(&mut *conn)
            .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn deactivate(
        conn: &mut PgConnection,
        id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("deactivate_match_request");
        let result = sqlx::query(
            "UPDATE match_requests SET is_active = false, updated_at = $2 WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .bind(at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    /// Deactivates every active request the group sent or received.
    pub async fn deactivate_for_group(
        conn: &mut PgConnection,
        group_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_match_requests_for_group");
        let result = sqlx::query(
            r#"
            UPDATE match_requests
            SET is_active = false, updated_at = $2
            WHERE is_active = true AND (sender_group_id = $1 OR receiver_group_id = $1)
            "#,
        )
        .bind(group_id)
        .bind(at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|r| r.rows_affected())
    }

    /// Requests the group sent, excluding canceled ones, newest first.
    pub async fn list_sent(
        conn: &mut PgConnection,
        group_id: Uuid,
    ) -> Result<Vec<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_sent_match_requests");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_group_id, receiver_group_id, status, is_active, cost_paid, created_at, updated_at
            FROM match_requests
            WHERE sender_group_id = $1 AND status <> 'canceled'
            ORDER BY created_at DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Requests the group received, excluding canceled ones, newest first.
    pub async fn list_received(
        conn: &mut PgConnection,
        group_id: Uuid,
    ) -> Result<Vec<MatchRequestEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_received_match_requests");
        let result = sqlx::query_as::<_, MatchRequestEntity>(
            r#"
            SELECT id, sender_group_id, receiver_group_id, status, is_active, cost_paid, created_at, updated_at
            FROM match_requests
            WHERE receiver_group_id = $1 AND status <> 'canceled'
            ORDER BY created_at DESC
            "#,
        )
        .bind(group_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }
}
