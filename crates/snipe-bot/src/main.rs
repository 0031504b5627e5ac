//! Listing sniper - Entry Point

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use snipe_bot::{AppConfig, Application, ListingRecord};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Timed order racing against an exchange listing instant
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SNIPE_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one listing now; the engine waits for its listing time
    Run {
        /// Listing JSON file (a single object)
        #[arg(short, long)]
        listing: PathBuf,
    },
    /// Run every future listing from a JSON array, each shortly before T0
    Schedule {
        /// Listings JSON file (an array of objects)
        #[arg(short, long)]
        listings: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Determine config path: CLI arg > SNIPE_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var_os("SNIPE_CONFIG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config_found = Path::new(&config_path).exists();
    let config = if config_found {
        AppConfig::from_file(&config_path)?
    } else {
        AppConfig::default()
    };

    snipe_telemetry::init_logging(&snipe_telemetry::logging::directive_for_level(
        &config.telemetry.log_level,
    ))?;

    info!("Starting snipe-bot v{}", env!("CARGO_PKG_VERSION"));
    if config_found {
        info!(config_path = %config_path.display(), "Configuration loaded");
    } else {
        warn!(config_path = %config_path.display(), "Config file not found, using defaults");
    }

    let app = Application::new(config);
    match args.command {
        Command::Run { listing } => {
            let record = ListingRecord::from_file(&listing)?;
            app.run_listing(record).await?;
        }
        Command::Schedule { listings } => {
            let records = ListingRecord::list_from_file(&listings)?;
            app.run_schedule(records).await?;
        }
    }

    Ok(())
}
