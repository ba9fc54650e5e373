//! Copie des références en texte

use std::str::FromStr;

use parcelle::{ParcelRecord, StatusKind};

/// Filtre sur le statut
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Success,
    Error,
}

impl StatusFilter {
    fn accepts(self, kind: StatusKind) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Success => kind == StatusKind::Success,
            StatusFilter::Error => kind == StatusKind::Error,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(StatusFilter::All),
            "success" => Ok(StatusFilter::Success),
            "error" => Ok(StatusFilter::Error),
            other => Err(format!("unknown status filter: {}", other)),
        }
    }
}

/// Filtre statut + recherche texte (commune, section ou numéro, sans casse)
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    pub status: StatusFilter,
    pub text: Option<String>,
}

impl RecordFilter {
    pub fn new(status: StatusFilter, text: Option<String>) -> Self {
        let text = text
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty());
        Self { status, text }
    }

    pub fn matches(&self, record: &ParcelRecord) -> bool {
        if !self.status.accepts(record.status_kind()) {
            return false;
        }

        let Some(text) = &self.text else {
            return true;
        };
        let q = &record.query;
        [&q.commune_name, &q.section, &q.numero]
            .iter()
            .any(|field| field.to_lowercase().contains(text.as_str()))
    }
}

/// `"<commune> Section <section> N° <numero>"`
pub fn clipboard_line(record: &ParcelRecord) -> String {
    let q = &record.query;
    format!("{} Section {} N° {}", q.commune_name, q.section, q.numero)
}

/// Une ligne par parcelle retenue, dans l'ordre
pub fn clipboard_lines(records: &[ParcelRecord], filter: &RecordFilter) -> Vec<String> {
    records
        .iter()
        .filter(|r| filter.matches(r))
        .map(clipboard_line)
        .collect()
}

/// Texte prêt à copier
pub fn clipboard_text(records: &[ParcelRecord], filter: &RecordFilter) -> String {
    clipboard_lines(records, filter).join("\n")
}
