//! Point d'entrée CLI pour cadastre-gpx

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

mod cli;

use cli::Commands;

/// Résoudre des références cadastrales en traces GPX
#[derive(Parser)]
#[command(name = "cadastre-gpx")]
#[command(author, version)]
#[command(about = "Résoudre des références de parcelles cadastrales et les exporter en traces GPX")]
#[command(long_about = "Extrait les références (commune, section, numéro) d'un texte libre, les résout une à une auprès des services publics de géocodage et du cadastre, puis exporte les géométries.\n\nUtilisez 'extract' pour vérifier l'extraction seule.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Extract {
            input,
            strategy,
            service,
        } => {
            info!(input = %input.display(), strategy = ?strategy, "Extraction");
            cli::cmd_extract(&input, strategy, &service).await?;
        }
        Commands::Resolve(args) => {
            info!(input = %args.input.display(), strategy = ?args.strategy, "Resolution");
            cli::cmd_resolve(args).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .init();
}
