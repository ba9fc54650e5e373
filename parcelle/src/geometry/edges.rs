//! Cotes des contours de parcelles
//!
//! Chaque segment de l'anneau extérieur (y compris le segment de fermeture) est
//! mesuré avec la distance de Haversine, celle qu'utilisent les widgets cartographiques.
//! Les segments de 2 m ou moins sont écartés (angles, artefacts de précision).

use std::collections::HashSet;

use geo::{Coord, Geometry, HaversineDistance, Point};

use super::polygons;
use crate::types::{Edge, LatLon, ParcelRecord};

/// Longueur minimale (exclue) d'un segment affiché, en mètres
pub const MIN_EDGE_LENGTH: f64 = 2.0;

/// Segments mesurés des parcelles visibles, dans l'ordre des enregistrements.
///
/// Recalculé à chaque appel, rien n'est mis en cache.
pub fn measure_edges<'a, I>(records: I, visible_ids: &HashSet<String>) -> Vec<Edge>
where
    I: IntoIterator<Item = &'a ParcelRecord>,
{
    records
        .into_iter()
        .filter(|r| visible_ids.contains(&r.id))
        .filter_map(|r| r.geometry().map(|g| geometry_edges(g, &r.id)))
        .flatten()
        .collect()
}

/// Segments mesurés des anneaux extérieurs d'une géométrie
pub fn geometry_edges(geometry: &Geometry, owner_id: &str) -> Vec<Edge> {
    let mut edges = Vec::new();

    for polygon in polygons(geometry) {
        let ring = &polygon.exterior().0;
        let n = ring.len();
        if n < 2 {
            continue;
        }

        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            let length = segment_length(a, b);
            if length > MIN_EDGE_LENGTH {
                edges.push(Edge {
                    position: midpoint(a, b),
                    length_meters: length.round(),
                    owner_id: owner_id.to_string(),
                });
            }
        }
    }

    edges
}

fn segment_length(a: Coord, b: Coord) -> f64 {
    Point::from(a).haversine_distance(&Point::from(b))
}

fn midpoint(a: Coord, b: Coord) -> LatLon {
    LatLon {
        lat: (a.y + b.y) / 2.0,
        lon: (a.x + b.x) / 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ParcelQuery;
    use geo::{coord, LineString, MultiPolygon, Polygon};

    /// ~111 m par millième de degré de latitude
    fn rectangle(x0: f64, y0: f64, dx: f64, dy: f64) -> Polygon {
        Polygon::new(
            LineString::new(vec![
                coord! { x: x0, y: y0 },
                coord! { x: x0 + dx, y: y0 },
                coord! { x: x0 + dx, y: y0 + dy },
                coord! { x: x0, y: y0 + dy },
                coord! { x: x0, y: y0 },
            ]),
            vec![],
        )
    }

    fn resolved(id: &str, geometry: Geometry) -> ParcelRecord {
        let mut record = ParcelRecord::new(id, ParcelQuery::new("X", "A", "1"));
        record.start_loading().unwrap();
        record.succeed("00000", geometry).unwrap();
        record
    }

    #[test]
    fn test_rectangle_edges() {
        let geometry = Geometry::Polygon(rectangle(7.0, 49.0, 0.001, 0.001));
        let edges = geometry_edges(&geometry, "p1");

        // 4 côtés, le segment de fermeture (nul) est écarté
        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.owner_id == "p1"));

        // côté sud : milieu et longueur (~73 m à 49°N)
        let south = &edges[0];
        assert!((south.position.lat - 49.0).abs() < 1e-12);
        assert!((south.position.lon - 7.0005).abs() < 1e-12);
        assert!(south.length_meters > 70.0 && south.length_meters < 76.0);
        assert_eq!(south.length_meters, south.length_meters.round());

        // côté est : ~111 m
        assert!(edges[1].length_meters > 109.0 && edges[1].length_meters < 113.0);
    }

    #[test]
    fn test_short_segments_suppressed() {
        // sommet intermédiaire à ~1 m du coin
        let ring = LineString::new(vec![
            coord! { x: 7.0, y: 49.0 },
            coord! { x: 7.001, y: 49.0 },
            coord! { x: 7.001, y: 49.00001 },
            coord! { x: 7.001, y: 49.001 },
            coord! { x: 7.0, y: 49.001 },
            coord! { x: 7.0, y: 49.0 },
        ]);
        let geometry = Geometry::Polygon(Polygon::new(ring, vec![]));
        let edges = geometry_edges(&geometry, "p1");

        assert_eq!(edges.len(), 4);
        assert!(edges.iter().all(|e| e.length_meters > MIN_EDGE_LENGTH));
    }

    #[test]
    fn test_triangle_closing_segment() {
        let ring = LineString(vec![
            coord! { x: 7.0, y: 49.0 },
            coord! { x: 7.001, y: 49.0 },
            coord! { x: 7.001, y: 49.001 },
        ]);
        let poly = Polygon::new(ring, vec![]);
        assert_eq!(poly.exterior().0.len(), 4);

        // l'hypoténuse est le segment qui referme l'anneau
        let edges = geometry_edges(&Geometry::Polygon(poly), "p1");
        assert_eq!(edges.len(), 3);
        assert!(edges[2].length_meters > edges[1].length_meters);
    }

    #[test]
    fn test_holes_not_measured() {
        let outer = rectangle(7.0, 49.0, 0.01, 0.01);
        let hole = rectangle(7.002, 49.002, 0.001, 0.001);
        let geometry = Geometry::Polygon(Polygon::new(
            outer.exterior().clone(),
            vec![hole.exterior().clone()],
        ));
        assert_eq!(geometry_edges(&geometry, "p1").len(), 4);
    }

    #[test]
    fn test_measure_only_visible_records() {
        let records = vec![
            resolved("1-0", Geometry::Polygon(rectangle(7.0, 49.0, 0.001, 0.001))),
            resolved(
                "1-1",
                Geometry::MultiPolygon(MultiPolygon::new(vec![
                    rectangle(7.1, 49.0, 0.001, 0.001),
                    rectangle(7.2, 49.0, 0.001, 0.001),
                ])),
            ),
            ParcelRecord::new("1-2", ParcelQuery::new("Y", "B", "2")),
        ];

        let none: HashSet<String> = HashSet::new();
        assert!(measure_edges(&records, &none).is_empty());

        let visible: HashSet<String> = ["1-1".to_string(), "1-2".to_string()].into();
        let edges = measure_edges(&records, &visible);
        assert_eq!(edges.len(), 8);
        assert!(edges.iter().all(|e| e.owner_id == "1-1"));
    }
}
