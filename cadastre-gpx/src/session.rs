//! Session de résolution
//!
//! Une session détient la liste courante des parcelles et la diffuse aux
//! observateurs via un canal `watch`. Chaque exécution remplace entièrement la
//! liste précédente.

use std::fmt;
use std::sync::Arc;

use parcelle::{ParcelRecord, SkippedLine};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::extract::{ExtractError, Extractor};
use crate::resolve::{CommuneLookup, ParcelLookup, ProgressSink, Resolver, Snapshot};

/// État d'une exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    Idle,
    Extracting,
    Resolving,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Idle => "idle",
            RunState::Extracting => "extracting",
            RunState::Resolving => "resolving",
            RunState::Done => "done",
        };
        f.write_str(s)
    }
}

/// Résultat d'une exécution réussie
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Parcelles dans l'ordre d'extraction
    pub records: Vec<ParcelRecord>,
    /// Lignes ignorées par l'extraction
    pub skipped: Vec<SkippedLine>,
}

/// Session d'exécutions successives
pub struct Session {
    sender: watch::Sender<Snapshot>,
    state: RunState,
    message: Option<String>,
    runs: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(empty_snapshot());
        Self {
            sender,
            state: RunState::Idle,
            message: None,
            runs: 0,
        }
    }

    /// Nouvel observateur de la liste courante
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.sender.subscribe()
    }

    /// Dernier instantané publié
    pub fn records(&self) -> Snapshot {
        self.sender.borrow().clone()
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Message de la dernière exécution en échec
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Extrait puis résout un texte.
    ///
    /// En cas d'échec de l'extraction, la liste est vidée, l'état revient à
    /// `Idle` et le message est conservé.
    pub async fn run<C, P>(
        &mut self,
        text: &str,
        extractor: &Extractor,
        resolver: &Resolver<C, P>,
    ) -> Result<RunOutcome, ExtractError>
    where
        C: CommuneLookup + Sync,
        P: ParcelLookup + Sync,
    {
        self.runs += 1;
        let run = self.runs;
        self.message = None;
        self.state = RunState::Extracting;
        self.sender.publish(empty_snapshot());

        info!(run, strategy = extractor.name(), "Starting run");

        let extraction = match extractor.extract(text).await {
            Ok(extraction) => extraction,
            Err(e) => {
                warn!(run, "Extraction failed: {}", e);
                self.sender.publish(empty_snapshot());
                self.state = RunState::Idle;
                self.message = Some(e.to_string());
                return Err(e);
            }
        };

        let records: Vec<ParcelRecord> = extraction
            .queries
            .into_iter()
            .enumerate()
            .map(|(idx, query)| ParcelRecord::new(format!("{}-{}", run, idx), query))
            .collect();

        self.state = RunState::Resolving;
        let records = resolver.resolve_all(records, &self.sender).await;
        self.state = RunState::Done;

        Ok(RunOutcome {
            records,
            skipped: extraction.skipped,
        })
    }
}

fn empty_snapshot() -> Snapshot {
    Arc::from(Vec::new())
}
