//! Traitements géométriques des parcelles résolues
//!
//! Fonctions pures sur les géométries en (longitude, latitude) :
//! - surface sphérique (anneaux extérieurs uniquement)
//! - découpage du contour en segments mesurés
//! - aplatissement en segments de trace pour l'export GPX

pub mod area;
pub mod edges;
pub mod track;

pub use area::{format_area, geometry_area, ring_area};
pub use edges::{geometry_edges, measure_edges, MIN_EDGE_LENGTH};
pub use track::track_segments;

use geo::{Geometry, Polygon};

/// Liste les polygones d'une géométrie, dans l'ordre (les autres types sont ignorés)
pub fn polygons(geometry: &Geometry) -> Vec<&Polygon> {
    let mut out = Vec::new();
    collect_polygons(geometry, &mut out);
    out
}

fn collect_polygons<'a>(geometry: &'a Geometry, out: &mut Vec<&'a Polygon>) {
    match geometry {
        Geometry::Polygon(p) => out.push(p),
        Geometry::MultiPolygon(mp) => out.extend(mp.0.iter()),
        Geometry::GeometryCollection(gc) => {
            for member in &gc.0 {
                collect_polygons(member, out);
            }
        }
        _ => {}
    }
}
