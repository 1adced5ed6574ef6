//! Hotplace entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::hotplace::{GeoPoint, Hotplace};
use sqlx::types::Json;
use sqlx::FromRow;

/// Database row mapping for the hotplaces table.
#[derive(Debug, Clone, FromRow)]
pub struct HotplaceEntity {
    pub id: i64,
    pub name: String,
    pub polygon: Json<Vec<GeoPoint>>,
    pub center_latitude: f64,
    pub center_longitude: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<HotplaceEntity> for Hotplace {
    fn from(entity: HotplaceEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            polygon: entity.polygon.0,
            center: GeoPoint::new(entity.center_latitude, entity.center_longitude),
            is_active: entity.is_active,
            created_at: entity.created_at,
        }
    }
}
