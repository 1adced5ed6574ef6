//! Point-in-polygon and nearest-zone queries over the hotplace catalog.
//!
//! The catalog is read from the store on every call; nothing is cached here.

use geo::algorithm::coordinate_position::{CoordPos, CoordinatePosition};
use geo::{Coord, HaversineDistance, LineString, Point, Polygon};

use crate::models::hotplace::{GeoPoint, Hotplace};

fn to_coord(point: &GeoPoint) -> Coord<f64> {
    Coord {
        x: point.longitude,
        y: point.latitude,
    }
}

fn to_polygon(vertices: &[GeoPoint]) -> Polygon<f64> {
    let ring: LineString<f64> = vertices.iter().map(to_coord).collect();
    // Polygon::new closes the ring if the last vertex differs from the first
    Polygon::new(ring, vec![])
}

/// Returns true when `point` is inside the polygon or on its boundary.
pub fn polygon_contains(vertices: &[GeoPoint], point: &GeoPoint) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    match to_polygon(vertices).coordinate_position(&to_coord(point)) {
        CoordPos::Inside | CoordPos::OnBoundary => true,
        CoordPos::Outside => false,
    }
}

/// First active hotplace containing `point`, in catalog order.
///
/// Polygons are expected not to overlap; if they do, the lowest id wins.
pub fn locate<'a>(hotplaces: &'a [Hotplace], point: &GeoPoint) -> Option<&'a Hotplace> {
    hotplaces
        .iter()
        .filter(|h| h.is_active)
        .find(|h| polygon_contains(&h.polygon, point))
}

/// Great-circle distance in meters.
pub fn distance_meters(a: &GeoPoint, b: &GeoPoint) -> f64 {
    Point::new(a.longitude, a.latitude).haversine_distance(&Point::new(b.longitude, b.latitude))
}

/// Active hotplace whose center is closest to `point`, with the distance in meters.
pub fn nearest<'a>(hotplaces: &'a [Hotplace], point: &GeoPoint) -> Option<(&'a Hotplace, f64)> {
    hotplaces
        .iter()
        .filter(|h| h.is_active)
        .map(|h| (h, distance_meters(&h.center, point)))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn square(id: i64, min_lat: f64, min_lon: f64, size: f64) -> Hotplace {
        Hotplace {
            id,
            name: format!("zone-{}", id),
            polygon: vec![
                GeoPoint::new(min_lat, min_lon),
                GeoPoint::new(min_lat, min_lon + size),
                GeoPoint::new(min_lat + size, min_lon + size),
                GeoPoint::new(min_lat + size, min_lon),
            ],
            center: GeoPoint::new(min_lat + size / 2.0, min_lon + size / 2.0),
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_inside_and_outside() {
        let zone = square(1, 37.0, 127.0, 0.1);
        assert!(polygon_contains(&zone.polygon, &GeoPoint::new(37.05, 127.05)));
        assert!(!polygon_contains(&zone.polygon, &GeoPoint::new(37.2, 127.05)));
    }

    #[test]
    fn test_edge_and_vertex_count_as_inside() {
        let zone = square(1, 0.0, 0.0, 1.0);
        // On the southern edge
        assert!(polygon_contains(&zone.polygon, &GeoPoint::new(0.0, 0.5)));
        // On a vertex
        assert!(polygon_contains(&zone.polygon, &GeoPoint::new(1.0, 1.0)));
    }

    #[test]
    fn test_concave_polygon() {
        // U shape opening north
        let polygon = vec![
            GeoPoint::new(0.0, 0.0),
            GeoPoint::new(0.0, 3.0),
            GeoPoint::new(3.0, 3.0),
            GeoPoint::new(3.0, 2.0),
            GeoPoint::new(1.0, 2.0),
            GeoPoint::new(1.0, 1.0),
            GeoPoint::new(3.0, 1.0),
            GeoPoint::new(3.0, 0.0),
        ];
        assert!(polygon_contains(&polygon, &GeoPoint::new(2.0, 0.5)));
        assert!(!polygon_contains(&polygon, &GeoPoint::new(2.0, 1.5)));
    }

    #[test]
    fn test_degenerate_polygon_contains_nothing() {
        let polygon = vec![GeoPoint::new(0.0, 0.0), GeoPoint::new(1.0, 1.0)];
        assert!(!polygon_contains(&polygon, &GeoPoint::new(0.0, 0.0)));
    }

    #[test]
    fn test_locate_first_match_wins() {
        let a = square(1, 0.0, 0.0, 2.0);
        let b = square(2, 1.0, 1.0, 2.0);
        let catalog = vec![a, b];
        let hit = locate(&catalog, &GeoPoint::new(1.5, 1.5)).unwrap();
        assert_eq!(hit.id, 1);
        let hit = locate(&catalog, &GeoPoint::new(2.5, 2.5)).unwrap();
        assert_eq!(hit.id, 2);
        assert!(locate(&catalog, &GeoPoint::new(5.0, 5.0)).is_none());
    }

    #[test]
    fn test_locate_skips_inactive() {
        let mut zone = square(1, 0.0, 0.0, 1.0);
        zone.is_active = false;
        assert!(locate(&[zone], &GeoPoint::new(0.5, 0.5)).is_none());
    }

    #[test]
    fn test_nearest() {
        let near = square(1, 37.50, 127.00, 0.01);
        let far = square(2, 35.10, 129.00, 0.01);
        let catalog = vec![far, near];
        let (hit, meters) = nearest(&catalog, &GeoPoint::new(37.51, 127.02)).unwrap();
        assert_eq!(hit.id, 1);
        assert!(meters < 5_000.0);
    }

    #[test]
    fn test_distance_roughly_one_degree_latitude() {
        let d = distance_meters(&GeoPoint::new(0.0, 0.0), &GeoPoint::new(1.0, 0.0));
        assert!((d - 111_195.0).abs() < 500.0);
    }
}
