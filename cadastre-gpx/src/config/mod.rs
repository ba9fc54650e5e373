//! Configuration des services distants

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// API Géo (découpage administratif)
pub const DEFAULT_GEO_API_URL: &str = "https://geo.api.gouv.fr";

/// API Carto, module cadastre
pub const DEFAULT_CADASTRE_API_URL: &str = "https://apicarto.ign.fr/api/cadastre";

/// API du modèle de langage (format `generateContent`)
pub const DEFAULT_LLM_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub const DEFAULT_LLM_MODEL: &str = "gemini-2.5-flash";

/// Configuration des services consommés
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// URL de base de l'API de géocodage des communes
    pub geo_api_url: String,

    /// URL de base de l'API des géométries cadastrales
    pub cadastre_api_url: String,

    /// URL de base de l'API du modèle de langage
    pub llm_api_url: String,

    /// Modèle utilisé pour l'extraction distante
    pub llm_model: String,

    /// Clé d'API du modèle de langage (jamais sérialisée)
    #[serde(skip_serializing)]
    pub llm_api_key: Option<String>,

    /// Timeout des requêtes HTTP en secondes
    pub timeout_secs: u64,

    /// User-Agent envoyé aux services
    pub user_agent: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            geo_api_url: DEFAULT_GEO_API_URL.into(),
            cadastre_api_url: DEFAULT_CADASTRE_API_URL.into(),
            llm_api_url: DEFAULT_LLM_API_URL.into(),
            llm_model: DEFAULT_LLM_MODEL.into(),
            llm_api_key: None,
            timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).into(),
        }
    }
}

impl ServiceConfig {
    /// Charge la configuration depuis les variables d'environnement
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            geo_api_url: std::env::var("GEO_API_URL").unwrap_or(defaults.geo_api_url),
            cadastre_api_url: std::env::var("CADASTRE_API_URL")
                .unwrap_or(defaults.cadastre_api_url),
            llm_api_url: std::env::var("LLM_API_URL").unwrap_or(defaults.llm_api_url),
            llm_model: std::env::var("LLM_MODEL").unwrap_or(defaults.llm_model),
            llm_api_key: api_key_from_env(),
            timeout_secs: std::env::var("HTTP_TIMEOUT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.timeout_secs),
            user_agent: defaults.user_agent,
        }
    }

    /// Charge une configuration depuis un fichier JSON (clés absentes = défauts)
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        let mut config: Self =
            serde_json::from_str(&content).context("Failed to parse config JSON")?;
        if config.llm_api_key.is_none() {
            config.llm_api_key = api_key_from_env();
        }
        Ok(config)
    }

    /// Applique les valeurs passées en ligne de commande
    pub fn apply_overrides(
        &mut self,
        geo_api_url: Option<String>,
        cadastre_api_url: Option<String>,
        llm_model: Option<String>,
    ) {
        if let Some(url) = geo_api_url {
            self.geo_api_url = url;
        }
        if let Some(url) = cadastre_api_url {
            self.cadastre_api_url = url;
        }
        if let Some(model) = llm_model {
            self.llm_model = model;
        }
    }

    /// Timeout des requêtes
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Client HTTP partagé par les services
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.timeout())
            .user_agent(self.user_agent.as_str())
            .build()
            .context("Failed to create HTTP client")
    }
}

fn api_key_from_env() -> Option<String> {
    std::env::var("GEMINI_API_KEY")
        .ok()
        .filter(|k| !k.trim().is_empty())
}
