//! Pairwatch launcher.

use anyhow::{Context, Result};
use clap::Parser;
use pairwatch::release::{self, BuildInfo};
use pairwatch::signal::shutdown_signal;
use pairwatch::Config;
use pairwatch_logging::{init_logging, LogConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    name = "pairwatch",
    version,
    about = "Verify data files against their .sha256 companions"
)]
struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, env = "PAIRWATCH_CONFIG", default_value = "config.yaml")]
    config: PathBuf,

    /// Also write logs to a rotated file in this directory
    #[arg(long, env = "PAIRWATCH_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    dry_run: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logging is configured by the file, so config errors go straight to stderr.
    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Held until exit so the file writer flushes.
    let _log_guard = match init_logging(LogConfig {
        app_name: &config.app_name,
        level: config.log_level(),
        log_dir: cli.log_dir.clone(),
    }) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let build = BuildInfo::current();
    info!("\n{}", build.banner(&config.app_name));
    info!("\n{}", config.summary());

    if let Err(e) = release::preflight(&build) {
        error!("Release check failed: {}", e);
        return ExitCode::FAILURE;
    }

    if cli.dry_run {
        info!("Configuration {} is valid", cli.config.display());
        return ExitCode::SUCCESS;
    }

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to build tokio runtime")?;

    let stats = runtime.block_on(pairwatch::run(&config, shutdown_signal()))?;
    println!("{}", stats.summary(chrono::Utc::now()));
    Ok(())
}
