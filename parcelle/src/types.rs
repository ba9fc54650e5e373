//! Types de données pour le crate parcelle

use std::fmt;

use geo::Geometry;
use serde::{Deserialize, Serialize};

use crate::ParcelError;

/// Référence cadastrale extraite d'un texte libre
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParcelQuery {
    /// Nom de la commune tel qu'il apparaît dans le texte
    pub commune_name: String,

    /// Code de section (1 ou 2 caractères, ex: "C", "AB", "0C")
    pub section: String,

    /// Numéro de parcelle, non complété
    pub numero: String,
}

impl ParcelQuery {
    pub fn new(
        commune_name: impl Into<String>,
        section: impl Into<String>,
        numero: impl Into<String>,
    ) -> Self {
        Self {
            commune_name: commune_name.into(),
            section: section.into(),
            numero: numero.into(),
        }
    }

    /// Numéro complété à 4 chiffres, format attendu par le service cadastre
    pub fn padded_numero(&self) -> String {
        format!("{:0>4}", self.numero)
    }

    /// Libellé "commune section numero"
    pub fn label(&self) -> String {
        format!("{} {} {}", self.commune_name, self.section, self.numero)
    }
}

/// Statut sans données associées (pour l'affichage, les filtres, les erreurs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    Pending,
    Loading,
    Success,
    Error,
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusKind::Pending => "pending",
            StatusKind::Loading => "loading",
            StatusKind::Success => "success",
            StatusKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// Statut de résolution d'une parcelle.
///
/// La géométrie n'existe que dans `Success`, le message que dans `Error`.
#[derive(Debug, Clone, PartialEq)]
pub enum ParcelStatus {
    Pending,
    Loading,
    Success { geometry: Geometry },
    Error { message: String },
}

impl ParcelStatus {
    pub fn kind(&self) -> StatusKind {
        match self {
            ParcelStatus::Pending => StatusKind::Pending,
            ParcelStatus::Loading => StatusKind::Loading,
            ParcelStatus::Success { .. } => StatusKind::Success,
            ParcelStatus::Error { .. } => StatusKind::Error,
        }
    }
}

/// Une parcelle en cours de résolution (une par référence extraite)
#[derive(Debug, Clone, PartialEq)]
pub struct ParcelRecord {
    /// Identifiant unique dans la session
    pub id: String,

    /// Référence extraite du texte
    pub query: ParcelQuery,

    insee_code: Option<String>,
    status: ParcelStatus,
}

impl ParcelRecord {
    /// Crée un enregistrement en attente
    pub fn new(id: impl Into<String>, query: ParcelQuery) -> Self {
        Self {
            id: id.into(),
            query,
            insee_code: None,
            status: ParcelStatus::Pending,
        }
    }

    pub fn status(&self) -> &ParcelStatus {
        &self.status
    }

    pub fn status_kind(&self) -> StatusKind {
        self.status.kind()
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, ParcelStatus::Success { .. })
    }

    /// Code INSEE de la commune, conservé même si la géométrie est introuvable
    pub fn insee_code(&self) -> Option<&str> {
        self.insee_code.as_deref()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        match &self.status {
            ParcelStatus::Success { geometry } => Some(geometry),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            ParcelStatus::Error { message } => Some(message),
            _ => None,
        }
    }

    /// pending → loading
    pub fn start_loading(&mut self) -> Result<(), ParcelError> {
        self.ensure_status(StatusKind::Pending, StatusKind::Loading)?;
        self.status = ParcelStatus::Loading;
        Ok(())
    }

    /// loading → success
    pub fn succeed(
        &mut self,
        insee_code: impl Into<String>,
        geometry: Geometry,
    ) -> Result<(), ParcelError> {
        self.ensure_status(StatusKind::Loading, StatusKind::Success)?;
        self.insee_code = Some(insee_code.into());
        self.status = ParcelStatus::Success { geometry };
        Ok(())
    }

    /// loading → error
    pub fn fail(
        &mut self,
        insee_code: Option<String>,
        message: impl Into<String>,
    ) -> Result<(), ParcelError> {
        self.ensure_status(StatusKind::Loading, StatusKind::Error)?;
        self.insee_code = insee_code;
        self.status = ParcelStatus::Error {
            message: message.into(),
        };
        Ok(())
    }

    fn ensure_status(&self, expected: StatusKind, to: StatusKind) -> Result<(), ParcelError> {
        let from = self.status.kind();
        if from != expected {
            return Err(ParcelError::invalid_transition(&self.id, from, to));
        }
        Ok(())
    }
}

/// Position géographique (ordre latitude, longitude)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

/// Point de trace GPX
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackPoint {
    pub lat: f64,
    pub lon: f64,
    /// Altitude (toujours 0, le cadastre est en 2D)
    pub ele: f64,
}

/// Segment de contour mesuré, pour l'affichage des cotes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edge {
    /// Milieu du segment
    pub position: LatLon,

    /// Longueur arrondie au mètre
    pub length_meters: f64,

    /// Identifiant de la parcelle propriétaire
    pub owner_id: String,
}
