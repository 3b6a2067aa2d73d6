//! Wiring of a `Config` into a `Topology`
//!
//! Resolves field names, builds the filter chain from the registry and
//! creates the source, sink instances and uploader the config names.

use std::sync::Arc;

use anyhow::{Context, Result};
use sluice_config::Config;
use sluice_pipeline::{ComponentParams, Topology, Validator, required_fields};
use sluice_record::{FieldMap, Layout};
use sluice_sinks::{create_sinks, create_uploader};
use sluice_sources::create_source;
use sluice_transform::default_registry;

/// Record layout described by `[record]`
pub fn layout(config: &Config) -> Result<Layout> {
    Layout::new(config.record.separator.byte(), config.record.max_fields)
        .context("invalid record layout")
}

/// Field map described by `[record]`
pub fn field_map(config: &Config) -> Result<Arc<FieldMap>> {
    let fields = FieldMap::new(config.record.fields.iter().cloned()).context("invalid field names")?;
    Ok(Arc::new(fields))
}

/// Validator described by `[validation]`, if any
pub fn validator(config: &Config, fields: &FieldMap) -> Result<Option<Validator>> {
    if !config.validation.is_enabled() {
        return Ok(None);
    }

    let indices = config
        .validation
        .required_fields
        .iter()
        .map(|name| {
            fields
                .index_of(name)
                .with_context(|| format!("unknown required field '{name}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(Some(required_fields(indices)))
}

/// Component parameters shared by the chain, sinks and topology
pub fn component_params(config: &Config) -> Result<ComponentParams> {
    let layout = layout(config)?;
    let fields = field_map(config)?;
    let mut params = ComponentParams::new(layout, Arc::clone(&fields));
    if let Some(validator) = validator(config, &fields)? {
        params = params.with_validator(validator);
    }
    Ok(params)
}

/// Build a topology, ready to start
pub fn build_topology(config: &Config) -> Result<Topology> {
    let params = component_params(config)?;

    let chain = default_registry()
        .build_chain(
            &config.filters,
            &params.fields,
            params.layout,
            params.validator.as_ref(),
            config.topology.on_error.into(),
        )
        .context("failed to build filter chain")?;

    let source = create_source(&config.source);
    let sinks = create_sinks(&config.sink, config.topology.sink_workers, &params);

    let mut builder = Topology::builder(source)
        .config(&config.topology)
        .layout(params.layout)
        .fields(Arc::clone(&params.fields))
        .chain(chain)
        .sinks(sinks);
    if let Some(validator) = &params.validator {
        builder = builder.validator(Arc::clone(validator));
    }
    if let Some(uploader) = &config.uploader {
        builder = builder.uploader(create_uploader(uploader));
    }

    builder.build().context("failed to build topology")
}
