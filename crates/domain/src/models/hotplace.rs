//! Hotplace (curated geographic zone) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct GeoPoint {
    #[validate(custom(function = "shared::validation::validate_latitude"))]
    pub latitude: f64,

    #[validate(custom(function = "shared::validation::validate_longitude"))]
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// A curated polygonal zone groups must be located in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Hotplace {
    pub id: i64,
    pub name: String,
    /// Ordered vertices. The ring is implicitly closed.
    pub polygon: Vec<GeoPoint>,
    pub center: GeoPoint,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a hotplace in the catalog.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct NewHotplace {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(length(min = 3, message = "Polygon needs at least 3 vertices"))]
    #[validate(nested)]
    pub polygon: Vec<GeoPoint>,

    #[validate(nested)]
    pub center: GeoPoint,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_validation() {
        assert!(GeoPoint::new(37.5, 127.0).validate().is_ok());
        assert!(GeoPoint::new(91.0, 127.0).validate().is_err());
        assert!(GeoPoint::new(37.5, 181.0).validate().is_err());
    }

    #[test]
    fn test_new_hotplace_requires_three_vertices() {
        let hp = NewHotplace {
            name: "Gangnam".to_string(),
            polygon: vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)],
            center: GeoPoint::new(0.5, 0.5),
        };
        assert!(hp.validate().is_err());
    }

    #[test]
    fn test_geo_point_serialization() {
        let json = serde_json::to_string(&GeoPoint::new(37.5, 127.25)).unwrap();
        assert_eq!(json, r#"{"latitude":37.5,"longitude":127.25}"#);
    }
}
