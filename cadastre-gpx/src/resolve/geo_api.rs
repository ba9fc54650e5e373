//! Géocodage des communes (API Géo)

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use tracing::debug;

use super::{check_status, Commune, CommuneLookup, LookupError};

/// Client de l'endpoint `/communes`
#[derive(Debug, Clone)]
pub struct GeoApiClient {
    client: Client,
    base_url: String,
}

impl GeoApiClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/communes", self.base_url.trim_end_matches('/'))
    }

    /// Meilleur résultat pondéré par la population
    fn request(&self, name: &str) -> RequestBuilder {
        self.client.get(self.endpoint()).query(&[
            ("nom", name),
            ("fields", "code,nom"),
            ("boost", "population"),
            ("limit", "1"),
        ])
    }
}

#[async_trait]
impl CommuneLookup for GeoApiClient {
    async fn find_commune(&self, name: &str) -> Result<Option<Commune>, LookupError> {
        let response = self.request(name).send().await?;
        check_status(response.status())?;

        let communes: Vec<Commune> = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;

        debug!(name, found = communes.len(), "Commune lookup");
        Ok(communes.into_iter().next())
    }
}
