//! flightsync - flight status aggregation CLI
//!
//! Reports go to stdout as JSON; logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use flightsync_common::config::{load_toml_config, resolve_config_path, TomlConfig};
use flightsync_common::{CanonicalFlightData, FlightIdentity};
use flightsync_engine::{AdapterRegistry, EngineError, FlightReport, FlightStatusEngine, ResolverConfig};
use serde::Deserialize;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for flightsync
#[derive(Parser, Debug)]
#[command(name = "flightsync")]
#[command(about = "Aggregate and reconcile flight status from multiple providers")]
#[command(version)]
struct Args {
    /// Config file (overrides FLIGHTSYNC_CONFIG and the default location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Report agreeing fields in the conflict list too
    #[arg(long, global = true)]
    all_fields: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Query every configured provider and resolve the flight
    Resolve {
        /// Carrier code (e.g. AA)
        #[arg(long)]
        carrier: String,

        /// Flight number without carrier prefix (e.g. 100)
        #[arg(long)]
        flight: String,

        /// Scheduled departure date (YYYY-MM-DD)
        #[arg(long)]
        date: NaiveDate,
    },

    /// Resolve observations recorded in JSON files
    ResolveFile {
        /// Files holding one observation or an array of observations
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ObservationFile {
    Many(Vec<CanonicalFlightData>),
    One(Box<CanonicalFlightData>),
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref());
    let loaded = config_path.as_deref().map(load_toml_config);

    let level = match &loaded {
        Some(Ok(config)) => config.logging.level.clone(),
        _ => "info".to_string(),
    };
    init_tracing(&level);

    let mut config = match (config_path, loaded) {
        (Some(path), Some(result)) => {
            let config = result.with_context(|| format!("Failed to load config {}", path.display()))?;
            info!(path = %path.display(), providers = config.providers.len(), "Configuration loaded");
            config
        }
        _ => {
            warn!("No config file found, using built-in defaults (no providers configured)");
            TomlConfig::default()
        }
    };

    if args.all_fields {
        config.resolver.report_agreements = true;
    }

    let report = match args.command {
        Command::Resolve { carrier, flight, date } => {
            let flight = FlightIdentity::new(carrier, flight, date).context("Invalid flight identity")?;
            resolve_flight(&config, &flight).await?
        }
        Command::ResolveFile { files } => resolve_files(&config, &files)?,
    };

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("Failed to serialize report")?
    );
    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("flightsync_engine={level},flightsync_common={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn resolve_flight(config: &TomlConfig, flight: &FlightIdentity) -> Result<FlightReport> {
    let engine = FlightStatusEngine::from_config(config).context("Failed to initialize engine")?;
    if engine.registry().is_empty() {
        bail!("No providers configured; add [[providers]] entries to the config file");
    }

    info!(flight = %flight, providers = ?engine.registry().names(), "Resolving flight");

    match engine.resolve_flight(flight).await {
        Ok(report) => Ok(report),
        Err(EngineError::NoDataAvailable { flight, outcomes }) => {
            for outcome in &outcomes {
                error!(source = %outcome.source, status = ?outcome.status, "Provider produced no observation");
            }
            bail!("Insufficient data: no provider answered for {}", flight)
        }
        Err(e) => Err(e.into()),
    }
}

fn resolve_files(config: &TomlConfig, files: &[PathBuf]) -> Result<FlightReport> {
    let mut observations = Vec::new();
    for path in files {
        observations.extend(read_observations(path)?);
    }

    let engine = FlightStatusEngine::new(AdapterRegistry::default(), ResolverConfig::from(&config.resolver));
    engine
        .resolve_observations(&observations)
        .context("Failed to resolve recorded observations")
}

fn read_observations(path: &Path) -> Result<Vec<CanonicalFlightData>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let parsed: ObservationFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse observations in {}", path.display()))?;

    Ok(match parsed {
        ObservationFile::Many(observations) => observations,
        ObservationFile::One(observation) => vec![*observation],
    })
}
