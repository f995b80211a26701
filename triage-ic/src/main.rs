//! triage-ic - Image Classification ingest module
//!
//! Walks an extracted disk image, sends every eligible image to the
//! object-detection service and appends findings to a JSON-lines evidence
//! file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use triage_common::config::{resolve_config_path, resolve_settings_path, LoggingConfig, TomlConfig};
use triage_common::events::EventBus;
use triage_common::Settings;

use triage_ic::services::{
    probe, DetectionClient, FileScanner, FindingEmitter, ImageClassificationModule,
    JsonLinesStore, TransportOptions,
};
use triage_ic::MODULE_NAME;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_HASH"),
    ", built ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Debug, Parser)]
#[command(name = "triage-ic", version, long_version = LONG_VERSION, about)]
struct Cli {
    /// Bootstrap TOML (logging, transport tuning)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Settings document (server, image formats, thresholds, classes)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log at debug level regardless of the configured level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify every eligible image under ROOT
    Scan {
        /// Extracted disk image or evidence directory
        root: PathBuf,

        /// Evidence file findings are appended to
        #[arg(long, default_value = "findings.jsonl")]
        evidence: PathBuf,
    },

    /// Check whether the detection service accepts connections
    Probe,

    /// Inspect or initialise the settings document
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
enum SettingsAction {
    /// Write the default settings document
    Init {
        /// Overwrite an existing document
        #[arg(long)]
        force: bool,
    },
    /// Print the effective settings as JSON
    Show,
    /// Load and validate the settings document
    Validate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = resolve_config_path(cli.config.as_deref())?;
    let toml_config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to read config {}", config_path.display()))?;

    init_logging(&toml_config.logging, cli.verbose)?;
    info!("Starting triage-ic {}", LONG_VERSION);

    let settings_path = resolve_settings_path(cli.settings.as_deref(), &toml_config)?;
    let options = TransportOptions::from(&toml_config.transport);

    match cli.command {
        Command::Scan { root, evidence } => run_scan(&settings_path, options, &root, &evidence).await,
        Command::Probe => run_probe(&settings_path, options).await,
        Command::Settings { action } => run_settings(&settings_path, action),
    }
}

async fn run_scan(
    settings_path: &Path,
    options: TransportOptions,
    root: &Path,
    evidence: &Path,
) -> Result<()> {
    let settings = Settings::load(settings_path)
        .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;

    let files = FileScanner::new()
        .scan(root)
        .with_context(|| format!("Cannot scan {}", root.display()))?;
    info!("Found {} entries under {}", files.len(), root.display());

    let store = JsonLinesStore::open(evidence)
        .with_context(|| format!("Cannot open evidence file {}", evidence.display()))?;
    let emitter = FindingEmitter::new(Box::new(store), EventBus::new(100), MODULE_NAME);

    let mut module =
        ImageClassificationModule::start_up(&settings, DetectionClient::new(options), emitter).await?;

    for file in &files {
        module.process(file).await;
    }

    let summary = module.shut_down();
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn run_probe(settings_path: &Path, options: TransportOptions) -> Result<()> {
    let settings = Settings::load(settings_path)?;
    let address = settings.server.address();

    if probe(&address, options.connect_timeout).await {
        println!("Detection service at {} is reachable", address);
        Ok(())
    } else {
        anyhow::bail!("Detection service at {} is not reachable", address)
    }
}

fn run_settings(settings_path: &Path, action: SettingsAction) -> Result<()> {
    match action {
        SettingsAction::Init { force } => {
            if settings_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    settings_path.display()
                );
            }
            Settings::default().save(settings_path)?;
            println!("Wrote default settings to {}", settings_path.display());
        }
        SettingsAction::Show => {
            let settings = Settings::load(settings_path)?;
            let candidate = settings.to_candidate();
            let enabled: Vec<&str> = settings
                .classes_of_interest
                .iter()
                .filter(|c| c.enabled)
                .map(|c| c.name.as_str())
                .collect();
            let view = serde_json::json!({
                "path": settings_path,
                "server": settings.server.address(),
                "imageFormats": candidate.image_formats,
                "minFileSizeKB": settings.min_file_size_kb,
                "minProbability": settings.min_probability,
                "enabledClasses": enabled,
            });
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
        SettingsAction::Validate => {
            Settings::load(settings_path)
                .with_context(|| format!("Invalid settings in {}", settings_path.display()))?;
            println!("{} is valid", settings_path.display());
        }
    }
    Ok(())
}

fn init_logging(logging: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { logging.level.as_str() };
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(level))?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match &logging.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Cannot open log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        }
        None => {
            builder
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;
        }
    }

    Ok(())
}
