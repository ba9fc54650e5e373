//! Types d'erreurs pour le crate parcelle

use thiserror::Error;

use crate::types::StatusKind;

/// Erreurs pouvant survenir lors du traitement des parcelles
#[derive(Debug, Error)]
pub enum ParcelError {
    /// Erreur d'I/O lors de l'écriture d'un document
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Transition de statut interdite (les statuts n'avancent que vers l'avant)
    #[error("Invalid status transition for {id}: {from} -> {to}")]
    InvalidTransition {
        id: String,
        from: StatusKind,
        to: StatusKind,
    },
}

impl ParcelError {
    /// Crée une erreur de transition avec contexte
    pub fn invalid_transition(id: impl Into<String>, from: StatusKind, to: StatusKind) -> Self {
        Self::InvalidTransition {
            id: id.into(),
            from,
            to,
        }
    }
}
