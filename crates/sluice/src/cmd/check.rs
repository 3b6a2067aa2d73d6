//! Check command - validate a config without running it
//!
//! Parses and validates the configuration, builds the topology (which
//! resolves every field name and filter) and prints what would run.

use anyhow::Result;
use clap::Args;
use serde_json::json;
use sluice_config::Config;
use sluice_pipeline::Topology;

use crate::builder;

/// Check command arguments
#[derive(Args, Debug, Default)]
pub struct CheckArgs {
    /// Print the resolved topology as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the check command
pub fn run(config: &Config, args: CheckArgs) -> Result<()> {
    let topology = builder::build_topology(config)?;
    let summary = summarize(config, &topology);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_human(&summary);
    }
    Ok(())
}

/// Resolved topology as a JSON value
fn summarize(config: &Config, topology: &Topology) -> serde_json::Value {
    let topo = &config.topology;
    json!({
        "record": {
            "separator": format!("0x{:02x}", config.record.separator.byte()),
            "max_fields": config.record.max_fields,
            "fields": config.record.fields,
        },
        "source": config.source.type_name(),
        "filters": config.enabled_filters(),
        "filter_workers": topo.effective_filter_workers(),
        "sink": config.sink.type_name(),
        "sink_workers": topo.sink_workers,
        "output": format!("{:?}", topology.output_mode()).to_lowercase(),
        "output_fields": topo.output_fields,
        "shard_field": topo.shard_field,
        "sink_queues": topology.sink_queue_count(),
        "uploader": config.uploader.as_ref().map(|u| u.type_name()),
        "required_fields": config.validation.required_fields,
    })
}

fn print_human(summary: &serde_json::Value) {
    println!("configuration ok");
    if let Some(entries) = summary.as_object() {
        for (key, value) in entries {
            match value {
                serde_json::Value::Object(inner) => {
                    println!("{key}:");
                    for (k, v) in inner {
                        println!("  {k}: {v}");
                    }
                }
                other => println!("{key}: {other}"),
            }
        }
    }
}
