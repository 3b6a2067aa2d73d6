//! Run command - run the pipeline to completion
//!
//! A batch job ends when the source reaches end of input. A daemon runs
//! until Ctrl-C; a second Ctrl-C exits without draining.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;
use sluice_config::Config;
use sluice_metrics::StatsReporter;
use tracing::{error, info};

use crate::builder;

/// Run command arguments
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Disable the periodic stats report
    #[arg(long)]
    pub no_stats: bool,
}

/// Run the run command
pub fn run(mut config: Config, args: RunArgs) -> Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        source = config.source.type_name(),
        sink = config.sink.type_name(),
        "sluice starting"
    );

    if args.no_stats {
        config.metrics.enabled = false;
    }

    let mut topology = builder::build_topology(&config)?;
    let reporter = StatsReporter::builder()
        .config(config.metrics.clone())
        .collector(Arc::new(topology.collector()))
        .build()
        .map(StatsReporter::spawn);

    let started = Instant::now();
    topology.start().context("failed to start topology")?;
    let result = topology.wait();

    if let Some(reporter) = reporter {
        reporter.shutdown();
    }

    let metrics = topology.metrics();
    if let Err(e) = result {
        error!(error = %e, "pipeline failed");
        return Err(e).context("pipeline failed");
    }

    info!(
        emitted = metrics.emitted(),
        undelivered = metrics.undelivered(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sluice finished"
    );
    Ok(())
}
