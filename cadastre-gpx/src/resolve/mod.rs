//! Résolution séquentielle des parcelles
//!
//! Pour chaque référence, dans l'ordre :
//! 1. la parcelle passe en `loading`
//! 2. la commune est géocodée (meilleur résultat pondéré par la population)
//! 3. la géométrie est demandée au cadastre avec le numéro complété à 4 chiffres ;
//!    une section d'un seul caractère est retentée une fois complétée d'un `0`
//! 4. la parcelle passe en `success` ou `error`
//!
//! Un instantané complet de la liste est publié après chaque changement, avant de
//! passer à la parcelle suivante. Les requêtes ne sont jamais parallélisées.

pub mod cadastre;
pub mod geo_api;

pub use cadastre::CadastreClient;
pub use geo_api::GeoApiClient;

use std::sync::Arc;

use async_trait::async_trait;
use geo::{Geometry, GeometryCollection};
use geojson::FeatureCollection;
use parcelle::{ParcelQuery, ParcelRecord};
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Message d'une parcelle dont la commune est introuvable
pub const COMMUNE_NOT_FOUND: &str = "Commune not found";

/// Message d'une parcelle dont la géométrie est introuvable
pub const GEOMETRY_NOT_FOUND: &str = "Parcel geometry not found in Cadastre";

/// Instantané immuable de la liste des parcelles
pub type Snapshot = Arc<[ParcelRecord]>;

/// Erreurs des services distants
#[derive(Debug, Error)]
pub enum LookupError {
    /// Erreur de transport
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Réponse non OK
    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    /// Réponse illisible
    #[error("Invalid response: {0}")]
    Decode(String),
}

/// Toute réponse hors 2xx est une erreur `Status`
pub fn check_status(status: StatusCode) -> Result<(), LookupError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(LookupError::Status(status.as_u16()))
    }
}

/// Commune renvoyée par le géocodage
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Commune {
    /// Code INSEE
    pub code: String,
    /// Nom officiel
    pub nom: String,
}

/// Géocodage commune → code INSEE
#[async_trait]
pub trait CommuneLookup {
    /// `Ok(None)` quand aucune commune ne correspond
    async fn find_commune(&self, name: &str) -> Result<Option<Commune>, LookupError>;
}

/// Géométrie d'une parcelle (code INSEE, section, numéro sur 4 chiffres)
#[async_trait]
pub trait ParcelLookup {
    async fn fetch_parcel(
        &self,
        insee_code: &str,
        section: &str,
        numero: &str,
    ) -> Result<FeatureCollection, LookupError>;
}

/// Destinataire des instantanés de progression
pub trait ProgressSink {
    fn publish(&self, snapshot: Snapshot);
}

impl ProgressSink for watch::Sender<Snapshot> {
    fn publish(&self, snapshot: Snapshot) {
        self.send_replace(snapshot);
    }
}

/// Sink qui ignore la progression
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn publish(&self, _snapshot: Snapshot) {}
}

/// Issue de la résolution d'une référence
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved { insee_code: String, geometry: Geometry },
    CommuneNotFound,
    GeometryNotFound { insee_code: String },
}

/// Résolveur séquentiel
pub struct Resolver<C, P> {
    communes: C,
    parcels: P,
}

impl<C, P> Resolver<C, P>
where
    C: CommuneLookup + Sync,
    P: ParcelLookup + Sync,
{
    pub fn new(communes: C, parcels: P) -> Self {
        Self { communes, parcels }
    }

    /// Résout toutes les parcelles, une à la fois, en publiant la progression
    pub async fn resolve_all<S>(&self, mut records: Vec<ParcelRecord>, sink: &S) -> Vec<ParcelRecord>
    where
        S: ProgressSink + ?Sized,
    {
        info!(parcels = records.len(), "Starting resolution");
        sink.publish(snapshot(&records));

        for idx in 0..records.len() {
            if let Err(e) = records[idx].start_loading() {
                warn!("Skipping parcel: {}", e);
                continue;
            }
            sink.publish(snapshot(&records));

            let resolution = self.resolve_query(&records[idx].query).await;
            let record = &mut records[idx];
            let applied = match resolution {
                Resolution::Resolved {
                    insee_code,
                    geometry,
                } => record.succeed(insee_code, geometry),
                Resolution::CommuneNotFound => record.fail(None, COMMUNE_NOT_FOUND),
                Resolution::GeometryNotFound { insee_code } => {
                    record.fail(Some(insee_code), GEOMETRY_NOT_FOUND)
                }
            };
            if let Err(e) = applied {
                warn!("Failed to record resolution: {}", e);
            }

            debug!(
                id = %record.id,
                status = %record.status_kind(),
                "Parcel resolved"
            );
            sink.publish(snapshot(&records));
        }

        let resolved = records.iter().filter(|r| r.is_success()).count();
        info!(
            resolved,
            failed = records.len() - resolved,
            "Resolution complete"
        );

        records
    }

    /// Résout une référence (commune puis géométrie)
    pub async fn resolve_query(&self, query: &ParcelQuery) -> Resolution {
        let commune = match self.communes.find_commune(&query.commune_name).await {
            Ok(Some(commune)) => commune,
            Ok(None) => {
                warn!(commune = %query.commune_name, "No commune matches");
                return Resolution::CommuneNotFound;
            }
            Err(e) => {
                warn!(commune = %query.commune_name, "Commune lookup failed: {}", e);
                return Resolution::CommuneNotFound;
            }
        };

        debug!(
            commune = %query.commune_name,
            code = %commune.code,
            nom = %commune.nom,
            "Commune resolved"
        );

        match self.fetch_geometry(&commune.code, query).await {
            Some(geometry) => Resolution::Resolved {
                insee_code: commune.code,
                geometry,
            },
            None => Resolution::GeometryNotFound {
                insee_code: commune.code,
            },
        }
    }

    async fn fetch_geometry(&self, insee_code: &str, query: &ParcelQuery) -> Option<Geometry> {
        let numero = query.padded_numero();

        let response = match self
            .parcels
            .fetch_parcel(insee_code, &query.section, &numero)
            .await
        {
            Err(e) if query.section.chars().count() == 1 => {
                let section = format!("0{}", query.section);
                debug!(
                    insee_code,
                    section = %section,
                    "Parcel lookup failed ({}), retrying with padded section",
                    e
                );
                self.parcels.fetch_parcel(insee_code, &section, &numero).await
            }
            other => other,
        };

        match response {
            Ok(collection) => {
                let geometry = collection_geometry(collection);
                if geometry.is_none() {
                    warn!(label = %query.label(), insee_code, "Cadastre returned no feature");
                }
                geometry
            }
            Err(e) => {
                warn!(label = %query.label(), insee_code, "Parcel lookup failed: {}", e);
                None
            }
        }
    }
}

/// Copie de la liste, publiée telle quelle
fn snapshot(records: &[ParcelRecord]) -> Snapshot {
    records.into()
}

/// Géométrie d'une FeatureCollection : le polygone seul, ou une collection.
///
/// Seuls `Polygon` et `MultiPolygon` sont retenus ; `None` s'il n'en reste aucun.
pub fn collection_geometry(collection: FeatureCollection) -> Option<Geometry> {
    let mut geometries: Vec<Geometry> = Vec::with_capacity(collection.features.len());

    for feature in collection.features {
        let Some(geometry) = feature.geometry else {
            continue;
        };
        match Geometry::<f64>::try_from(geometry) {
            Ok(g @ (Geometry::Polygon(_) | Geometry::MultiPolygon(_))) => geometries.push(g),
            Ok(_) => warn!("Ignoring non-polygonal feature geometry"),
            Err(e) => warn!("Ignoring unreadable feature geometry: {}", e),
        }
    }

    match geometries.len() {
        0 => None,
        1 => geometries.pop(),
        _ => Some(Geometry::GeometryCollection(GeometryCollection(geometries))),
    }
}
