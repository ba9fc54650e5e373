//! Extraction distante par modèle de langage (API `generateContent`)
//!
//! Le modèle reçoit le texte avec des consignes et renvoie un tableau JSON
//! contraint par un schéma de réponse.

use parcelle::ParcelQuery;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::{debug, info};

use super::ExtractError;
use crate::config::ServiceConfig;

const INSTRUCTIONS: &str = "\
Extract every French cadastral parcel reference from the text below.
For each parcel return communeName, section and numero.
- numero: digits only, left-padded with zeros to 4 digits (45 becomes 0045).
- section: 1 or 2 characters. A leading 'S' that only marks the section (as in 'S C') is not part of it.
- Ignore headers, titles and lines that are not parcel references.
Return an empty array when the text contains no parcel.";

/// Client d'extraction distante
#[derive(Debug, Clone)]
pub struct RemoteExtractor {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

impl RemoteExtractor {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key,
        }
    }

    pub fn from_config(client: Client, config: &ServiceConfig) -> Self {
        Self::new(
            client,
            config.llm_api_url.clone(),
            config.llm_model.clone(),
            config.llm_api_key.clone(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    /// Envoie le texte au modèle et renvoie les références proposées
    pub async fn extract(&self, text: &str) -> Result<Vec<ParcelQuery>, ExtractError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(ExtractError::MissingApiKey)?;

        info!(model = %self.model, chars = text.len(), "Sending text to remote extractor");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .json(&request_body(text))
            .send()
            .await
            .map_err(|e| ExtractError::remote(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::remote(format!("invalid response body: {}", e)))?;

        let queries = parse_response(&payload)?;
        debug!(parcels = queries.len(), "Remote extraction answered");
        Ok(queries)
    }
}

/// Erreur d'un statut non 2xx ; le corps n'est lu qu'à titre indicatif
fn status_error(status: StatusCode, body: &str) -> ExtractError {
    let detail = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message").and_then(Value::as_str).map(str::to_string))
        .unwrap_or_else(|| {
            let body = body.trim();
            if body.is_empty() {
                "no detail".to_string()
            } else {
                body.chars().take(200).collect()
            }
        });
    ExtractError::remote(format!("HTTP {}: {}", status.as_u16(), detail))
}

/// Schéma imposé à la réponse du modèle
fn response_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "communeName": { "type": "STRING" },
                "section": { "type": "STRING" },
                "numero": { "type": "STRING" }
            },
            "required": ["communeName", "section", "numero"]
        }
    })
}

/// Corps de la requête `generateContent`
pub fn request_body(text: &str) -> Value {
    json!({
        "contents": [{
            "role": "user",
            "parts": [{ "text": format!("{}\n\nText:\n{}", INSTRUCTIONS, text) }]
        }],
        "generationConfig": {
            "responseMimeType": "application/json",
            "responseSchema": response_schema()
        }
    })
}

/// Lit les références dans la première partie texte du premier candidat
pub fn parse_response(payload: &Value) -> Result<Vec<ParcelQuery>, ExtractError> {
    let text = payload
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| ExtractError::remote("response has no candidate text"))?;

    let queries: Vec<ParcelQuery> = serde_json::from_str(text)
        .map_err(|e| ExtractError::remote(format!("candidate is not a parcel list: {}", e)))?;

    Ok(queries
        .into_iter()
        .map(|q| ParcelQuery::new(q.commune_name.trim(), q.section.trim(), q.numero.trim()))
        .collect())
}
