//! Point ledger repository.

use domain::models::PointConsumption;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::entities::{LedgerEntryKindDb, PointConsumptionEntity, PointReasonDb};
use crate::metrics::QueryTimer;

/// Repository for the append-only point_consumptions table.
pub struct PointRepository;

impl PointRepository {
    pub async fn insert(
        conn: &mut PgConnection,
        entry: &PointConsumption,
    ) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("insert_point_consumption");
        let result = sqlx::query(
            r#"
            INSERT INTO point_consumptions (id, user_id, kind, amount, reason, idempotency_key, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(LedgerEntryKindDb::from(entry.kind))
        .bind(entry.amount)
        .bind(PointReasonDb::from(entry.reason))
        .bind(&entry.idempotency_key)
        .bind(entry.created_at)
        .execute(&mut *conn)
        .await;
        timer.record();
        result.map(|_| ())
    }

    pub async fn find_by_key(
        conn: &mut PgConnection,
        idempotency_key: &str,
    ) -> Result<Option<PointConsumptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_point_consumption_by_key");
        let result = sqlx::query_as::<_, PointConsumptionEntity>(
            r#"
            SELECT id, user_id, kind, amount, reason, idempotency_key, created_at
            FROM point_consumptions
            WHERE idempotency_key = $1
            "#,
        )
        .bind(idempotency_key)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    /// Ledger history of a user, newest first.
    pub async fn list_for_user(
        conn: &mut PgConnection,
        user_id: Uuid,
    ) -> Result<Vec<PointConsumptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_point_consumptions");
        let result = sqlx::query_as::<_, PointConsumptionEntity>(
            r#"
            SELECT id, user_id, kind, amount, reason, idempotency_key, created_at
            FROM point_consumptions
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }
}
