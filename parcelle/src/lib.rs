//! # parcelle
//!
//! Références de parcelles cadastrales françaises : extraction depuis du texte libre,
//! modèle de résolution, traitements géométriques et traces GPX.
//!
//! ## Features
//!
//! - Extraction déterministe (commune, section, numéro) ligne par ligne
//! - Statuts de résolution qui n'avancent que vers l'avant
//! - Surface sphérique, cotes des contours, aplatissement en traces
//! - Écriture GPX 1.1 en streaming
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust
//! use parcelle::extract::extract;
//!
//! let extraction = extract("SCHORBACH S C N° 0584\nLENGELSHEIM B 45");
//! assert_eq!(extraction.queries.len(), 2);
//! assert_eq!(extraction.queries[0].section, "C");
//! ```

pub mod error;
pub mod extract;
pub mod geometry;
pub mod gpx;
pub mod types;

pub use error::ParcelError;
pub use extract::{Extraction, SkippedLine};
pub use types::{Edge, LatLon, ParcelQuery, ParcelRecord, ParcelStatus, StatusKind, TrackPoint};
