//! Rapport d'exécution
//!
//! Regroupe les compteurs, les échecs par parcelle et les lignes ignorées
//! d'une exécution, pour l'affichage et l'export JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use parcelle::{ParcelRecord, SkippedLine, StatusKind};
use serde::Serialize;

use crate::session::RunOutcome;

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les parcelles sont résolues
    Success,
    /// Certaines parcelles sont en erreur
    PartialSuccess,
    /// Aucune parcelle résolue
    Failed,
}

/// Échec d'une parcelle
#[derive(Debug, Clone, Serialize)]
pub struct RecordFailure {
    pub id: String,
    /// "commune section numero"
    pub label: String,
    /// Code INSEE, si la commune a été trouvée
    pub insee: Option<String>,
    pub message: String,
}

/// Rapport complet
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Stratégie d'extraction utilisée
    pub strategy: String,
    pub duration_secs: f64,
    pub status: RunStatus,

    pub parcels: usize,
    pub resolved: usize,
    pub failed: usize,

    /// Surface cumulée des parcelles résolues (m²)
    pub total_area_m2: f64,

    pub failures: Vec<RecordFailure>,
    pub skipped: Vec<SkippedLine>,
}

impl RunReport {
    /// Construit le rapport d'une exécution
    pub fn from_outcome(strategy: &str, outcome: &RunOutcome, duration: Duration) -> Self {
        let mut report = Self {
            strategy: strategy.to_string(),
            duration_secs: duration.as_secs_f64(),
            status: RunStatus::Success,
            parcels: 0,
            resolved: 0,
            failed: 0,
            total_area_m2: 0.0,
            failures: Vec::new(),
            skipped: outcome.skipped.clone(),
        };

        for record in &outcome.records {
            report.record(record);
        }
        report.finalize();
        report
    }

    fn record(&mut self, record: &ParcelRecord) {
        self.parcels += 1;
        match record.status_kind() {
            StatusKind::Success => {
                self.resolved += 1;
                if let Some(geometry) = record.geometry() {
                    self.total_area_m2 += parcelle::geometry::geometry_area(geometry);
                }
            }
            StatusKind::Error => {
                self.failed += 1;
                self.failures.push(RecordFailure {
                    id: record.id.clone(),
                    label: record.query.label(),
                    insee: record.insee_code().map(str::to_string),
                    message: record.error_message().unwrap_or_default().to_string(),
                });
            }
            StatusKind::Pending | StatusKind::Loading => {}
        }
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.resolved == 0 {
            RunStatus::Failed
        } else if self.failed > 0 || self.resolved < self.parcels {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("RUN REPORT - {} extraction", self.strategy);
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);

        println!("\n--- SUMMARY ---");
        println!(
            "Parcels: {} total, {} resolved, {} failed",
            self.parcels, self.resolved, self.failed
        );
        println!(
            "Area: {}",
            parcelle::geometry::format_area(self.total_area_m2)
        );

        if !self.skipped.is_empty() {
            println!("\n--- SKIPPED LINES ({}) ---", self.skipped.len());
            for s in self.skipped.iter().take(10) {
                println!("  line {}: {}", s.line_number, s.content);
            }
            if self.skipped.len() > 10 {
                println!("  ... and {} more", self.skipped.len() - 10);
            }
        }

        if !self.failures.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.failures.len());
            for f in self.failures.iter().take(20) {
                let insee = f
                    .insee
                    .as_deref()
                    .map(|c| format!(" [{}]", c))
                    .unwrap_or_default();
                println!("  {} {}{}: {}", f.id, f.label, insee, f.message);
            }
            if self.failures.len() > 20 {
                println!("  ... and {} more", self.failures.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{}: {} parcels, {} resolved, {} failed, {} skipped lines",
            self.strategy,
            self.parcels,
            self.resolved,
            self.failed,
            self.skipped.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Geometry};
    use parcelle::ParcelQuery;

    fn outcome(successes: usize, failures: usize) -> RunOutcome {
        let mut records = Vec::new();
        for i in 0..successes {
            let mut r = ParcelRecord::new(format!("1-{}", i), ParcelQuery::new("SCHORBACH", "C", "584"));
            r.start_loading().unwrap();
            r.succeed(
                "57640",
                Geometry::Polygon(polygon![
                    (x: 7.0, y: 49.0),
                    (x: 7.001, y: 49.0),
                    (x: 7.001, y: 49.001),
                    (x: 7.0, y: 49.0),
                ]),
            )
            .unwrap();
            records.push(r);
        }
        for i in 0..failures {
            let mut r = ParcelRecord::new(
                format!("1-{}", successes + i),
                ParcelQuery::new("BITCHE", "A", "12"),
            );
            r.start_loading().unwrap();
            r.fail(Some("57089".into()), "Parcel geometry not found in Cadastre")
                .unwrap();
            records.push(r);
        }

        RunOutcome {
            records,
            skipped: vec![SkippedLine {
                line_number: 1,
                content: "Liste des parcelles".into(),
            }],
        }
    }

    #[test]
    fn test_success() {
        let report = RunReport::from_outcome("pattern", &outcome(2, 0), Duration::from_millis(1500));
        assert_eq!(report.status, RunStatus::Success);
        assert_eq!(report.parcels, 2);
        assert_eq!(report.resolved, 2);
        assert!(report.total_area_m2 > 0.0);
        assert_eq!(report.duration_secs, 1.5);
    }

    #[test]
    fn test_partial_success() {
        let report = RunReport::from_outcome("pattern", &outcome(1, 1), Duration::ZERO);
        assert_eq!(report.status, RunStatus::PartialSuccess);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].label, "BITCHE A 12");
        assert_eq!(report.failures[0].insee.as_deref(), Some("57089"));
    }

    #[test]
    fn test_failed() {
        let report = RunReport::from_outcome("llm", &outcome(0, 2), Duration::ZERO);
        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.total_area_m2, 0.0);
    }

    #[test]
    fn test_summary() {
        let report = RunReport::from_outcome("pattern", &outcome(1, 1), Duration::ZERO);
        let summary = report.summary();
        assert!(summary.starts_with("pattern:"));
        assert!(summary.contains("1 resolved"));
        assert!(summary.contains("1 skipped lines"));
    }

    #[test]
    fn test_save_to_file() {
        let report = RunReport::from_outcome("pattern", &outcome(1, 1), Duration::ZERO);
        let path = std::env::temp_dir().join("cadastre_gpx_report.json");
        report.save_to_file(&path).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["status"], "PartialSuccess");
        assert_eq!(json["failures"][0]["id"], "1-1");
        assert_eq!(json["skipped"][0]["line_number"], 1);

        std::fs::remove_file(path).ok();
    }
}
