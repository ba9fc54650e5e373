//! Géométries des parcelles (API Carto, module cadastre)

use async_trait::async_trait;
use geojson::{Feature, FeatureCollection, GeoJson};
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::{check_status, LookupError, ParcelLookup};

/// Client de l'endpoint `/parcelle`
#[derive(Debug, Clone)]
pub struct CadastreClient {
    client: Client,
    base_url: String,
}

impl CadastreClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/parcelle", self.base_url.trim_end_matches('/'))
    }

    /// `numero` est attendu déjà complété à 4 chiffres
    fn request(&self, insee_code: &str, section: &str, numero: &str) -> RequestBuilder {
        self.client.get(self.endpoint()).query(&[
            ("code_insee", insee_code),
            ("section", section),
            ("numero", numero),
        ])
    }
}

#[async_trait]
impl ParcelLookup for CadastreClient {
    async fn fetch_parcel(
        &self,
        insee_code: &str,
        section: &str,
        numero: &str,
    ) -> Result<FeatureCollection, LookupError> {
        let response = self.request(insee_code, section, numero).send().await?;
        if let Err(e) = check_status(response.status()) {
            debug!(insee_code, section, numero, "Parcel lookup rejected: {}", e);
            return Err(e);
        }

        let body = response.text().await?;
        let collection = parse_feature_collection(&body)?;
        debug!(
            insee_code,
            section,
            numero,
            features = collection.features.len(),
            "Parcel lookup"
        );
        Ok(collection)
    }
}

/// Normalise une réponse GeoJSON en FeatureCollection.
///
/// Une Feature ou une Geometry seule est acceptée et enveloppée.
pub fn parse_feature_collection(body: &str) -> Result<FeatureCollection, LookupError> {
    let geojson: GeoJson = body
        .parse()
        .map_err(|e: geojson::Error| LookupError::Decode(e.to_string()))?;

    let features = match geojson {
        GeoJson::FeatureCollection(collection) => return Ok(collection),
        GeoJson::Feature(feature) => vec![feature],
        GeoJson::Geometry(geometry) => vec![Feature::from(geometry)],
    };

    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}
