//! Aplatissement des géométries en segments de trace
//!
//! Tous les anneaux sont parcourus (trous compris) : extérieur, puis trous,
//! puis polygone suivant. C'est ici, et seulement ici, que l'ordre des
//! coordonnées passe de (longitude, latitude) à (latitude, longitude).

use geo::{Geometry, LineString};

use super::polygons;
use crate::types::TrackPoint;

/// Un segment de trace par anneau, dans un ordre déterministe
pub fn track_segments(geometry: &Geometry) -> Vec<Vec<TrackPoint>> {
    polygons(geometry)
        .into_iter()
        .flat_map(|p| std::iter::once(p.exterior()).chain(p.interiors()))
        .map(ring_points)
        .collect()
}

fn ring_points(ring: &LineString) -> Vec<TrackPoint> {
    ring.coords()
        .map(|c| TrackPoint {
            lat: c.y,
            lon: c.x,
            ele: 0.0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, MultiPolygon, Point, Polygon};

    fn ring(x0: f64, y0: f64, d: f64) -> LineString {
        LineString::new(vec![
            coord! { x: x0, y: y0 },
            coord! { x: x0 + d, y: y0 },
            coord! { x: x0 + d, y: y0 + d },
            coord! { x: x0, y: y0 },
        ])
    }

    #[test]
    fn test_coordinates_swapped() {
        let geometry = Geometry::Polygon(Polygon::new(ring(7.0, 49.0, 0.01), vec![]));
        let segments = track_segments(&geometry);

        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].len(), 4);
        assert_eq!(
            segments[0][1],
            TrackPoint {
                lat: 49.0,
                lon: 7.01,
                ele: 0.0
            }
        );
    }

    #[test]
    fn test_ring_order() {
        let first = Polygon::new(
            ring(7.0, 49.0, 0.01),
            vec![ring(7.002, 49.001, 0.001), ring(7.005, 49.001, 0.001)],
        );
        let second = Polygon::new(ring(8.0, 48.0, 0.01), vec![]);
        let geometry = Geometry::MultiPolygon(MultiPolygon::new(vec![first, second]));

        let segments = track_segments(&geometry);
        let starts: Vec<(f64, f64)> = segments.iter().map(|s| (s[0].lat, s[0].lon)).collect();

        assert_eq!(
            starts,
            vec![(49.0, 7.0), (49.001, 7.002), (49.001, 7.005), (48.0, 8.0)]
        );
        assert!(segments.iter().flatten().all(|p| p.ele == 0.0));
    }

    #[test]
    fn test_non_polygon_ignored() {
        let geometry = Geometry::Point(Point::new(7.0, 49.0));
        assert!(track_segments(&geometry).is_empty());
    }
}
