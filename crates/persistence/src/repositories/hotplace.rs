//! Hotplace repository.

use chrono::{DateTime, Utc};
use domain::models::hotplace::NewHotplace;
use sqlx::types::Json;
use sqlx::PgConnection;

use crate::entities::HotplaceEntity;
use crate::metrics::QueryTimer;

/// Repository for the hotplace catalog.
pub struct HotplaceRepository;

impl HotplaceRepository {
    /// Active hotplaces ordered by id.
    pub async fn list_active(conn: &mut PgConnection) -> Result<Vec<HotplaceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_active_hotplaces");
        let result = sqlx::query_as::<_, HotplaceEntity>(
            r#"
            SELECT id, name, polygon, center_latitude, center_longitude, is_active, created_at
            FROM hotplaces
            WHERE is_active = true
            ORDER BY id
            "#,
        )
        .fetch_all(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(
        conn: &mut PgConnection,
        id: i64,
    ) -> Result<Option<HotplaceEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_hotplace_by_id");
        let result = sqlx::query_as::<_, HotplaceEntity>(
            r#"
            SELECT id, name, polygon, center_latitude, center_longitude, is_active, created_at
            FROM hotplaces
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await;
        timer.record();
        result
    }

    pub async fn insert(
        conn: &mut PgConnection,
        hotplace: &NewHotplace,
        at: DateTime<Utc>,
    ) -> Result<HotplaceEntity, sqlx::Error> {
        let timer = QueryTimer::new("insert_hotplace");
        let result = sqlx::query_as::<_, HotplaceEntity>(
            r#"
            INSERT INTO hotplaces (name, polygon, center_latitude, center_longitude, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, polygon, center_latitude, center_longitude, is_active, created_at
            "#,
        )
        .bind(&hotplace.name)
        .bind(Json(&hotplace.polygon))
        .bind(hotplace.center.latitude)
        .bind(hotplace.center.longitude)
        .bind(at)
        .fetch_one(&mut *conn)
        .await;
        timer.record();
        result
    }
}
