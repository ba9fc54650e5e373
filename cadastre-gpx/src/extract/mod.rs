//! Stratégies d'extraction des références
//!
//! Deux stratégies interchangeables, choisies par l'utilisateur, sans repli de
//! l'une vers l'autre : les motifs déterministes de [`parcelle::extract`] ou un
//! modèle de langage distant.

pub mod remote;

pub use remote::RemoteExtractor;

use std::fmt;

use parcelle::Extraction;
use thiserror::Error;
use tracing::info;

/// Erreurs d'extraction (fatales pour l'exécution)
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Texte vide ou blanc
    #[error("Input text is empty")]
    EmptyInput,

    /// Aucune référence reconnue
    #[error("No parcel reference found in input")]
    NoParcelFound,

    /// Clé d'API absente pour l'extraction distante
    #[error("Remote extraction requires GEMINI_API_KEY")]
    MissingApiKey,

    /// Échec du service distant
    #[error("Remote extraction failed: {0}")]
    Remote(String),
}

impl ExtractError {
    pub fn remote(reason: impl Into<String>) -> Self {
        Self::Remote(reason.into())
    }
}

/// Stratégie d'extraction
#[derive(Debug, Clone)]
pub enum Extractor {
    /// Motifs ligne par ligne
    Pattern,
    /// Modèle de langage distant
    Remote(RemoteExtractor),
}

impl Extractor {
    pub fn name(&self) -> &'static str {
        match self {
            Extractor::Pattern => "pattern",
            Extractor::Remote(_) => "llm",
        }
    }

    /// Extrait les références du texte.
    ///
    /// Un texte vide ou sans aucune référence est une erreur, quelle que soit la stratégie.
    pub async fn extract(&self, text: &str) -> Result<Extraction, ExtractError> {
        if text.trim().is_empty() {
            return Err(ExtractError::EmptyInput);
        }

        let extraction = match self {
            Extractor::Pattern => parcelle::extract::extract(text),
            Extractor::Remote(remote) => Extraction {
                queries: remote.extract(text).await?,
                skipped: Vec::new(),
            },
        };

        if extraction.is_empty() {
            return Err(ExtractError::NoParcelFound);
        }

        info!(
            strategy = self.name(),
            parcels = extraction.queries.len(),
            skipped = extraction.skipped.len(),
            "Extraction complete"
        );

        Ok(extraction)
    }
}

impl fmt::Display for Extractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Extractor::Pattern => f.write_str("pattern"),
            Extractor::Remote(remote) => write!(f, "llm ({})", remote.model()),
        }
    }
}
