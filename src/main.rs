//! label-scan - ingredient label scanning service
//!
//! Reads a photo of a food label, extracts the ingredient list and flags
//! animal-derived, alcohol-derived and harmful ingredients.

mod analysis;
mod classifier;
mod config;
mod extract;
mod pipeline;
mod server;
mod storage;
mod vision;

#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::classifier::ModelManager;
use crate::config::AppConfig;
use crate::pipeline::LabelScanner;

/// label-scan - ingredient label scanning service
#[derive(Parser, Debug)]
#[command(name = "label-scan")]
#[command(about = "Scan food labels for animal, alcohol and harmful ingredients")]
struct Args {
    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Address to listen on, overrides the config file
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Scan a label photo and print the report
    Scan {
        /// Image file
        image: PathBuf,
    },
    /// Analyze an OCR text dump and print the report
    Analyze {
        /// Text file holding the recognized label text
        text: PathBuf,
    },
    /// Download missing classifier artifacts
    FetchModel,
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let command = args.command.unwrap_or(Command::Serve { bind: None });

    if let Command::InitConfig { force } = command {
        return init_config(args.config, force);
    }

    let (config, source) = load_or_default_config(args.config.as_deref())?;
    init_logging(&config);

    match source {
        Some(path) => info!("Loaded configuration from {:?}", path),
        None => info!("Using default configuration"),
    }

    match command {
        Command::Serve { bind } => run_server(config, bind).await,
        Command::Scan { image } => {
            let bytes = std::fs::read(&image)
                .with_context(|| format!("Failed to read image {:?}", image))?;
            let scanner = LabelScanner::from_config(&config).await?;
            let report = scanner.scan(bytes).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::Analyze { text } => {
            let raw = std::fs::read_to_string(&text)
                .with_context(|| format!("Failed to read text file {:?}", text))?;
            let scanner = LabelScanner::from_config(&config).await?;
            let report = scanner.analyze_text(&raw)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Command::FetchModel => {
            let manager = ModelManager::new(config.artifact_sources());
            manager.ensure_all().await?;
            for (kind, available, size) in manager.status() {
                println!(
                    "{:<22} {:<9} {}",
                    kind.display_name(),
                    if available { "ready" } else { "missing" },
                    size.map(|s| format!("{} bytes", s)).unwrap_or_default()
                );
            }
            Ok(())
        }
        Command::InitConfig { force } => init_config(args.config, force),
    }
}

/// Write the default configuration file
fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => storage::default_config_path()?,
    };
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists, use --force to overwrite", path);
    }
    config::save_config(&AppConfig::default(), &path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

/// Initialize logging; `RUST_LOG` wins over the configured level
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Load configuration from file, or fall back to defaults when none exists
fn load_or_default_config(explicit: Option<&Path>) -> Result<(AppConfig, Option<PathBuf>)> {
    let (mut config, source) = match explicit {
        Some(path) => (config::load_config(path)?, Some(path.to_path_buf())),
        None => {
            let path = storage::default_config_path()?;
            if path.exists() {
                (config::load_config(&path)?, Some(path))
            } else {
                (AppConfig::default(), None)
            }
        }
    };

    config.apply_env_overrides();
    config.resolve_paths(&storage::get_data_dir()?);
    Ok((config, source))
}

async fn run_server(config: AppConfig, bind: Option<String>) -> Result<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind_addr.clone());
    let addr: SocketAddr = bind
        .parse()
        .with_context(|| format!("Invalid bind address {:?}", bind))?;

    info!("label-scan starting...");
    let scanner = Arc::new(LabelScanner::from_config(&config).await?);
    info!(
        "Keyword sets: {} animal, {} alcohol",
        scanner.keywords().animal().len(),
        scanner.keywords().alcohol().len()
    );

    let app = server::router(scanner, config.server.max_upload_bytes);
    server::serve(addr, app).await
}
