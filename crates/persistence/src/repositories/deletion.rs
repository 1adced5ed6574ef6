//! Deletion schedule repository.

use chrono::{DateTime, Utc};
use domain::models::deletion::{DeletionSchedule, DeletionStatus};
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::{DeletionScheduleEntity, DeletionStatusDb};
use crate::metrics::QueryTimer;

/// Repository for scheduled user deletions.
pub struct DeletionRepository;

impl DeletionRepository {
    pub async fn insert(
        conn: &mut PgConnection,
        schedule: &DeletionSchedule,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_deletion_schedule");
        let result = sqlx::query(
            r#"
            INSERT INTO deletion_schedules (id, user_id, reason, scheduled_at, status, created_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(schedule.id)
        .bind(schedule.user_id)
        .bind(&schedule.reason)
        .bind(schedule.scheduled_at)
        .bind(DeletionStatusDb::from(schedule.status))
        .bind(schedule.created_at)
        .bind(schedule.completed_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_waiting(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Option<DeletionScheduleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_waiting_deletion_schedule");
        let result = sqlx::query_as::<_, DeletionScheduleEntity>(
            r#"
            SELECT id, user_id, reason, scheduled_at, status, created_at, completed_at
            FROM deletion_schedules
            WHERE user_id = $1 AND status = 'waiting'
            "#,
        )
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Waiting schedules due before `now`, oldest first.
    pub async fn list_due(
        conn: &mut PgConnection,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<DeletionScheduleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_due_deletion_schedules");
        let result = sqlx::query_as::<_, DeletionScheduleEntity>(
            r#"
            SELECT id, user_id, reason, scheduled_at, status, created_at, completed_at
            FROM deletion_schedules
            WHERE status = 'waiting' AND scheduled_at < $1
            ORDER BY scheduled_at
            LIMIT $2
            "#,
        )
        .bind(now)
        .bind(limit)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Locks a schedule; rows another worker already holds are skipped.
    pub async fn lock_by_id(
        conn: &mut PgConnection,
        id: Uuid,
    ) -> Result<Option<DeletionScheduleEntity>, sqlx::Error> {
        let timer = QueryTimer::new("lock_deletion_schedule");
        let result = sqlx::query_as::<_, DeletionScheduleEntity>(
            r#"
            SELECT id, user_id, reason, scheduled_at, status, created_at, completed_at
            FROM deletion_schedules
            WHERE id = $1
            FOR UPDATE SKIP LOCKED
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
        status: DeletionStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("update_deletion_schedule_status");
        let result = sqlx::query(
            "UPDATE deletion_schedules SET status = $2, completed_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(DeletionStatusDb::from(status))
        .bind(completed_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }
}
