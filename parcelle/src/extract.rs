//! Extraction déterministe des références cadastrales
//!
//! Le texte est traité ligne par ligne. Chaque ligne est confrontée à deux motifs,
//! dans l'ordre, et le premier qui correspond l'emporte :
//!
//! 1. explicite : `<commune> <marqueur section> <section> [<marqueur numéro>] <numéro>`
//!    (ex: `SCHORBACH S C N° 0584`)
//! 2. minimaliste : `<commune> <section> <numéro>` (ex: `LENGELSHEIM B 45`)
//!
//! La commune est capturée de façon paresseuse : les marqueurs sont reconnus plutôt
//! qu'absorbés dans le nom. Une ligne qui ne correspond à aucun motif est ignorée
//! et remontée dans [`Extraction::skipped`].

use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::types::ParcelQuery;

/// Marqueurs de section reconnus (insensibles à la casse)
pub const SECTION_MARKERS: &[&str] = &["SECTION", "SECT", "SEC", "S"];

/// Marqueurs de numéro reconnus (insensibles à la casse)
pub const NUMBER_MARKERS: &[&str] = &["NUMÉRO", "NUMERO", "NUM", "N°", "Nº", "NO", "N"];

/// Motif ayant produit une référence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinePattern {
    /// Avec marqueur de section (et éventuellement de numéro)
    Explicit,
    /// Commune, section, numéro sans marqueur
    Minimal,
}

/// Ligne non blanche qui ne correspond à aucun motif
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    /// Numéro de ligne (à partir de 1) dans le texte d'origine
    pub line_number: usize,
    /// Contenu de la ligne, sans les blancs de début et de fin
    pub content: String,
}

/// Résultat de l'extraction d'un texte
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Extraction {
    /// Références dans l'ordre du texte
    pub queries: Vec<ParcelQuery>,
    /// Lignes ignorées
    pub skipped: Vec<SkippedLine>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

fn explicit_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        let pattern = format!(
            r"(?i)^(?P<commune>.+?)\s+(?:{})\.?\s+(?P<section>[A-Z0-9]{{1,2}})\s+(?:(?:{})\.?\s*)?(?P<numero>[0-9]+)$",
            alternation(SECTION_MARKERS),
            alternation(NUMBER_MARKERS),
        );
        Regex::new(&pattern).expect("explicit parcel pattern is valid")
    })
}

fn minimal_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<commune>.+?)\s+(?P<section>[A-Z0-9]{1,2})\s+(?P<numero>[0-9]+)$")
            .expect("minimal parcel pattern is valid")
    })
}

fn alternation(markers: &[&str]) -> String {
    markers
        .iter()
        .map(|m| regex::escape(m))
        .collect::<Vec<_>>()
        .join("|")
}

/// Extrait les références d'un texte libre, avec les lignes ignorées
pub fn extract(text: &str) -> Extraction {
    let mut extraction = Extraction::default();

    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        match parse_line(line) {
            Some((query, pattern)) => {
                debug!(
                    line = idx + 1,
                    pattern = ?pattern,
                    commune = %query.commune_name,
                    section = %query.section,
                    numero = %query.numero,
                    "Parcel reference matched"
                );
                extraction.queries.push(query);
            }
            None => {
                debug!(line = idx + 1, content = line, "No parcel pattern matched");
                extraction.skipped.push(SkippedLine {
                    line_number: idx + 1,
                    content: line.to_string(),
                });
            }
        }
    }

    extraction
}

/// Extrait uniquement les références, dans l'ordre du texte
pub fn extract_queries(text: &str) -> Vec<ParcelQuery> {
    extract(text).queries
}

/// Analyse une ligne (déjà débarrassée de ses blancs)
pub fn parse_line(line: &str) -> Option<(ParcelQuery, LinePattern)> {
    if let Some(caps) = explicit_pattern().captures(line) {
        if let Some(query) = query_from(&caps) {
            return Some((query, LinePattern::Explicit));
        }
    }

    minimal_pattern()
        .captures(line)
        .and_then(|caps| query_from(&caps))
        .map(|query| (query, LinePattern::Minimal))
}

fn query_from(caps: &Captures) -> Option<ParcelQuery> {
    let commune = caps
        .name("commune")?
        .as_str()
        .trim()
        .trim_end_matches([',', ';', ':', '-'])
        .trim_end();
    if commune.is_empty() {
        return None;
    }

    let section = caps.name("section")?.as_str().to_uppercase();
    let numero = caps.name("numero")?.as_str();

    Some(ParcelQuery::new(commune, section, numero))
}
