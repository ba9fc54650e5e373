//! Modules d'export (archive GPX, couche GeoJSON, texte à copier)

pub mod archive;
pub mod clipboard;
pub mod geojson;

pub use archive::ExportOutcome;
