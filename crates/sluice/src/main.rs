//! Sluice - record pipeline
//!
//! # Usage
//!
//! ```bash
//! # Run the pipeline (default)
//! sluice --config sluice.toml
//! sluice --config sluice.toml run
//!
//! # Validate a config and print the resolved topology
//! sluice --config sluice.toml check
//! ```

mod builder;
mod cmd;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sluice_config::{Config, LogConfig, LogFormat, LogOutput};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

/// Config files tried, in order, when `--config` is not given
const DEFAULT_CONFIG_PATHS: [&str; 2] = ["sluice.toml", "configs/sluice.toml"];

/// Sluice - record pipeline
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (error if specified but not found)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline until the source ends or Ctrl-C
    Run(cmd::run::RunArgs),

    /// Validate the configuration and print the resolved topology
    Check(cmd::check::CheckArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Check(args)) => {
            // Check only prints to stdout
            cmd::check::run(&config, args)
        }
        Some(Command::Run(args)) => {
            init_logging(&config.log, cli.log_level.as_deref())?;
            cmd::run::run(config, args)
        }
        None => {
            init_logging(&config.log, cli.log_level.as_deref())?;
            cmd::run::run(config, cmd::run::RunArgs::default())
        }
    }
}

/// Load the given config file, else the first default path found, else defaults
fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Some(path) = path {
        if !path.exists() {
            anyhow::bail!("config file not found: {}", path.display());
        }
        return Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()));
    }

    match DEFAULT_CONFIG_PATHS.iter().map(Path::new).find(|p| p.exists()) {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

/// Initialize the tracing subscriber for logging
fn init_logging(config: &LogConfig, override_level: Option<&str>) -> Result<()> {
    let directive = config.filter_directive(override_level);
    let filter = EnvFilter::try_new(&directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let writer = match config.output {
        LogOutput::Stdout => BoxMakeWriter::new(io::stdout),
        LogOutput::Stderr => BoxMakeWriter::new(io::stderr),
    };
    let layer = match config.format {
        LogFormat::Console => fmt::layer()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(writer)
            .boxed(),
        LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
    };

    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init()
        .context("failed to install log subscriber")?;

    Ok(())
}
