//! Définition et implémentation des commandes CLI
//!
//! - `extract` : texte → références (commune, section, numéro)
//! - `resolve` : texte → parcelles résolues, puis exports (archive GPX, couche
//!   cartographique, texte à copier, rapport)

use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing::{info, warn};

use cadastre_gpx::export::archive::{export_archive, ExportOutcome};
use cadastre_gpx::export::clipboard::{clipboard_text, RecordFilter, StatusFilter};
use cadastre_gpx::export::geojson::{export_map_layer, MapView};
use cadastre_gpx::extract::{Extractor, RemoteExtractor};
use cadastre_gpx::resolve::{CadastreClient, GeoApiClient, Resolver, Snapshot};
use cadastre_gpx::{RunReport, ServiceConfig, Session};
use parcelle::geometry::{format_area, geometry_area};
use parcelle::{ParcelRecord, StatusKind};

/// Stratégie d'extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// Motifs déterministes
    Pattern,
    /// Modèle de langage distant (GEMINI_API_KEY)
    Llm,
}

/// Options communes de configuration
#[derive(Debug, Args)]
pub struct ServiceArgs {
    /// JSON config file (missing keys fall back to env / defaults)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Commune geocoding API base URL
    #[arg(long)]
    pub geo_api: Option<String>,

    /// Cadastre API base URL
    #[arg(long)]
    pub cadastre_api: Option<String>,

    /// Model used by the llm strategy
    #[arg(long)]
    pub model: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract parcel references from text (no resolution)
    Extract {
        /// Input text file, or '-' for stdin
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Extraction strategy
        #[arg(short, long, value_enum, default_value_t = Strategy::Pattern)]
        strategy: Strategy,

        #[command(flatten)]
        service: ServiceArgs,
    },

    /// Extract, resolve and export parcels
    Resolve(ResolveArgs),
}

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Input text file, or '-' for stdin
    #[arg(short, long, default_value = "-")]
    pub input: PathBuf,

    /// Extraction strategy
    #[arg(short, long, value_enum, default_value_t = Strategy::Pattern)]
    pub strategy: Strategy,

    #[command(flatten)]
    pub service: ServiceArgs,

    /// Output directory for the GPX archive
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Write a GeoJSON map layer to this file
    #[arg(long)]
    pub map: Option<PathBuf>,

    /// Record id highlighted on the map layer
    #[arg(long)]
    pub select: Option<String>,

    /// Record ids whose edges are measured on the map layer
    #[arg(long, num_args = 1..)]
    pub measure: Vec<String>,

    /// Measure every record
    #[arg(long, conflicts_with = "measure")]
    pub measure_all: bool,

    /// Print references for copy (all, success, error)
    #[arg(long)]
    pub copy: Option<StatusFilter>,

    /// Text filter applied to --copy (commune, section or numero)
    #[arg(long)]
    pub filter: Option<String>,

    /// Save the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Exécute la commande extract
pub async fn cmd_extract(input: &Path, strategy: Strategy, service: &ServiceArgs) -> Result<()> {
    let text = read_input(input)?;
    let config = load_config(service)?;
    let extractor = build_extractor(strategy, &config)?;

    let extraction = extractor.extract(&text).await?;

    for query in &extraction.queries {
        println!("{}\t{}\t{}", query.commune_name, query.section, query.numero);
    }

    if !extraction.skipped.is_empty() {
        eprintln!("\nSkipped lines: {}", extraction.skipped.len());
        for line in &extraction.skipped {
            eprintln!("  line {}: {}", line.line_number, line.content);
        }
    }

    Ok(())
}

/// Exécute la commande resolve
pub async fn cmd_resolve(args: ResolveArgs) -> Result<()> {
    let text = read_input(&args.input)?;
    let config = load_config(&args.service)?;
    let extractor = build_extractor(args.strategy, &config)?;

    let client = config.http_client()?;
    let resolver = Resolver::new(
        GeoApiClient::new(client.clone(), config.geo_api_url.as_str()),
        CadastreClient::new(client, config.cadastre_api_url.as_str()),
    );

    info!(
        strategy = %extractor,
        geo_api = %config.geo_api_url,
        cadastre_api = %config.cadastre_api_url,
        "Resolving parcels"
    );

    let start = Instant::now();
    let mut session = Session::new();
    let progress = tokio::spawn(print_progress(session.subscribe()));

    let result = session.run(&text, &extractor, &resolver).await;
    drop(session);
    if let Err(e) = progress.await {
        warn!("Progress printer stopped: {}", e);
    }
    let outcome = result?;

    let report = RunReport::from_outcome(extractor.name(), &outcome, start.elapsed());
    let records = &outcome.records;

    print_table(records);

    if let Some(dir) = &args.output {
        let date = chrono::Local::now().date_naive();
        match export_archive(records, dir, date)? {
            ExportOutcome::Refused => {
                println!("\nNo resolved parcel: archive not written");
            }
            ExportOutcome::Written { path, files } => {
                println!("\nArchive: {} ({} GPX)", path.display(), files.len());
            }
        }
    }

    if let Some(map) = &args.map {
        let view = if args.measure_all {
            MapView::measure_all(args.select.clone(), records)
        } else {
            MapView::new(args.select.clone(), args.measure.iter().cloned())
        };
        let features = export_map_layer(records, &view, map)?;
        println!("Map layer: {} ({} features)", map.display(), features);
    }

    if let Some(status) = args.copy {
        let filter = RecordFilter::new(status, args.filter.clone());
        println!("\n{}", clipboard_text(records, &filter));
    }

    report.display();
    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        println!("Report saved: {}", path.display());
    }

    info!("{}", report.summary());
    Ok(())
}

/// Lit le texte depuis un fichier ou l'entrée standard (`-`)
fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(path).context(format!("Failed to read input: {}", path.display()))
}

/// Fichier de config, sinon environnement, puis options de la ligne de commande
fn load_config(args: &ServiceArgs) -> Result<ServiceConfig> {
    let mut config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::from_env(),
    };
    config.apply_overrides(
        args.geo_api.clone(),
        args.cadastre_api.clone(),
        args.model.clone(),
    );
    Ok(config)
}

fn build_extractor(strategy: Strategy, config: &ServiceConfig) -> Result<Extractor> {
    Ok(match strategy {
        Strategy::Pattern => Extractor::Pattern,
        Strategy::Llm => Extractor::Remote(RemoteExtractor::from_config(
            config.http_client()?,
            config,
        )),
    })
}

/// Affiche chaque parcelle terminée, au fil des instantanés
async fn print_progress(mut rx: watch::Receiver<Snapshot>) {
    let mut printed = 0;

    while rx.changed().await.is_ok() {
        let snapshot = rx.borrow_and_update().clone();
        if snapshot.len() < printed {
            printed = 0;
        }

        let done = snapshot
            .iter()
            .take_while(|r| matches!(r.status_kind(), StatusKind::Success | StatusKind::Error))
            .count();

        for record in &snapshot[printed..done] {
            eprintln!(
                "[{}/{}] {} {}",
                printed + 1,
                snapshot.len(),
                record.query.label(),
                record.status_kind()
            );
            printed += 1;
        }
    }
}

fn print_table(records: &[ParcelRecord]) {
    println!("\n{:<8} {:<32} {:<8} Detail", "Id", "Parcel", "Status");
    for record in records {
        let detail = match record.geometry() {
            Some(geometry) => format_area(geometry_area(geometry)),
            None => record.error_message().unwrap_or_default().to_string(),
        };
        println!(
            "{:<8} {:<32} {:<8} {}",
            record.id,
            record.query.label(),
            record.status_kind().to_string(),
            detail
        );
    }
}
