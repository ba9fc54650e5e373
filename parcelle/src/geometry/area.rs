//! Surface sphérique des parcelles
//!
//! Formule de l'excès sphérique approché (Chamberlain & Duquette) sur une sphère
//! de rayon équatorial WGS84. Ce n'est pas un calcul géodésique exact, mais l'écart
//! est négligeable à l'échelle d'une parcelle.

use geo::{Geometry, LineString};

use super::polygons;

/// Rayon équatorial WGS84 en mètres
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Au-delà de cette surface (m²), l'affichage passe en hectares
pub const HECTARE_THRESHOLD: f64 = 10_000.0;

/// Espace fine insécable, séparateur de milliers en français
const THOUSANDS_SEPARATOR: char = '\u{202F}';

/// Surface signée d'un anneau (longitude, latitude) en m²
pub fn signed_ring_area(ring: &LineString) -> f64 {
    let coords = &ring.0;
    let n = coords.len();
    if n < 3 {
        return 0.0;
    }

    let mut total = 0.0;
    for i in 0..n {
        let p1 = coords[i];
        let p2 = coords[(i + 1) % n];
        total += (p2.x - p1.x).to_radians()
            * (2.0 + p1.y.to_radians().sin() + p2.y.to_radians().sin());
    }

    total * EARTH_RADIUS * EARTH_RADIUS / 2.0
}

/// Surface absolue d'un anneau en m²
pub fn ring_area(ring: &LineString) -> f64 {
    signed_ring_area(ring).abs()
}

/// Surface d'une géométrie : somme des anneaux extérieurs, trous ignorés
pub fn geometry_area(geometry: &Geometry) -> f64 {
    polygons(geometry)
        .into_iter()
        .map(|p| ring_area(p.exterior()))
        .sum()
}

/// Libellé de surface : m² arrondis jusqu'à 1 ha, hectares à 4 décimales au-delà
pub fn format_area(area: f64) -> String {
    if area > HECTARE_THRESHOLD {
        format!("{:.4} ha", area / HECTARE_THRESHOLD)
    } else {
        format!("{} m²", group_thousands(area.round().max(0.0) as u64))
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 * 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(THOUSANDS_SEPARATOR);
        }
        out.push(c);
    }
    out
}
