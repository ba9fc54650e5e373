//! # cadastre-gpx
//!
//! Résolution de références cadastrales françaises en géométries, et export en
//! traces GPX.
//!
//! ## Features
//!
//! - Extraction par motifs ou par modèle de langage distant
//! - Résolution séquentielle : géocodage de la commune, puis géométrie cadastrale
//! - Progression diffusée par instantanés (`tokio::sync::watch`)
//! - Export d'une archive GPX, d'une couche GeoJSON et d'un texte à copier
//!
//! ## Usage CLI
//!
//! ```bash
//! # Vérifier l'extraction
//! cadastre-gpx extract --input parcelles.txt
//!
//! # Résoudre et exporter l'archive GPX
//! cadastre-gpx resolve --input parcelles.txt --output ./gpx/ --map carte.geojson
//!
//! # Extraction distante
//! GEMINI_API_KEY=... cadastre-gpx resolve --strategy llm --input parcelles.txt
//! ```

pub mod config;
pub mod export;
pub mod extract;
pub mod report;
pub mod resolve;
pub mod session;

pub use config::ServiceConfig;
pub use extract::{ExtractError, Extractor};
pub use report::{RunReport, RunStatus};
pub use resolve::{LookupError, Resolver};
pub use session::{RunOutcome, RunState, Session};
