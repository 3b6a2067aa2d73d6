//! Configuration validation
//!
//! Validates config consistency:
//! - Declared field names are unique and fit the layout
//! - Fields referenced by the topology and validation sections exist
//! - Queue capacities and worker counts are non-zero
//! - Sharding is only requested for sink types that support it
//! - Required fields are present for the selected components
//! - Filter types are valid

use crate::Config;
use crate::error::{ConfigError, Result};
use crate::filters::is_known_filter_type;
use crate::sinks::{SinkConfig, UploaderConfig};
use crate::sources::SourceConfig;
use std::collections::HashSet;

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_record(config)?;
    validate_topology(config)?;
    validate_source(config)?;
    validate_sink(config)?;
    validate_uploader(config)?;
    validate_filters(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_record(config: &Config) -> Result<()> {
    let record = &config.record;

    if record.max_fields == 0 {
        return Err(ConfigError::invalid_value(
            "record",
            "max_fields",
            "must be at least 1",
        ));
    }

    if record.fields.len() > record.max_fields {
        return Err(ConfigError::invalid_value(
            "record",
            "fields",
            format!(
                "{} names declared but max_fields is {}",
                record.fields.len(),
                record.max_fields
            ),
        ));
    }

    let mut seen = HashSet::new();
    for name in &record.fields {
        if name.is_empty() {
            return Err(ConfigError::invalid_value(
                "record",
                "fields",
                "field names cannot be empty",
            ));
        }
        if !seen.insert(name.as_str()) {
            return Err(ConfigError::invalid_value(
                "record",
                "fields",
                format!("duplicate field name '{name}'"),
            ));
        }
    }

    for name in &config.validation.required_fields {
        if !record.has_field(name) {
            return Err(ConfigError::unknown_field("validation.required_fields", name));
        }
    }

    Ok(())
}

fn validate_topology(config: &Config) -> Result<()> {
    let topology = &config.topology;

    let sizes = [
        ("input_queue_size", topology.input_queue_size),
        ("sink_queue_size", topology.sink_queue_size),
        ("upload_queue_size", topology.upload_queue_size),
        ("sink_workers", topology.sink_workers),
    ];
    for (field, value) in sizes {
        if value == 0 {
            return Err(ConfigError::invalid_value(
                "topology",
                field,
                "must be at least 1",
            ));
        }
    }

    if topology.filter_workers == Some(0) {
        return Err(ConfigError::invalid_value(
            "topology",
            "filter_workers",
            "must be at least 1",
        ));
    }

    for name in &topology.output_fields {
        if !config.record.has_field(name) {
            return Err(ConfigError::unknown_field("topology.output_fields", name));
        }
    }

    if config.sink.output().needs_fields() && topology.output_fields.is_empty() {
        return Err(ConfigError::invalid_value(
            "topology",
            "output_fields",
            format!(
                "{} sink writes projected fields but no output fields are configured",
                config.sink.type_name()
            ),
        ));
    }

    if let Some(ref shard) = topology.shard_field {
        if !config.record.has_field(shard) {
            return Err(ConfigError::unknown_field("topology.shard_field", shard));
        }
        if !config.sink.supports_sharding() {
            return Err(ConfigError::invalid_value(
                "topology",
                "shard_field",
                format!("{} sink does not support sharding", config.sink.type_name()),
            ));
        }
    }

    Ok(())
}

fn validate_source(config: &Config) -> Result<()> {
    if let SourceConfig::File(ref file) = config.source
        && file.path.as_os_str().is_empty()
    {
        return Err(ConfigError::missing_field("source", "path"));
    }

    if config.source.batch_bytes() == 0 {
        return Err(ConfigError::invalid_value(
            "source",
            "batch_bytes",
            "must be at least 1",
        ));
    }

    Ok(())
}

fn validate_sink(config: &Config) -> Result<()> {
    if let SinkConfig::File(ref file) = config.sink {
        if file.dir.as_os_str().is_empty() {
            return Err(ConfigError::missing_field("sink", "dir"));
        }
        if file.prefix.is_empty() {
            return Err(ConfigError::invalid_value(
                "sink",
                "prefix",
                "cannot be empty",
            ));
        }
    }
    Ok(())
}

fn validate_uploader(config: &Config) -> Result<()> {
    match config.uploader {
        Some(UploaderConfig::Move(ref mv)) if mv.destination.as_os_str().is_empty() => {
            Err(ConfigError::missing_field("uploader", "destination"))
        }
        _ => Ok(()),
    }
}

fn validate_filters(config: &Config) -> Result<()> {
    for filter in &config.filters {
        if !is_known_filter_type(&filter.filter_type) {
            return Err(ConfigError::UnknownFilterType(filter.filter_type.clone()));
        }
    }
    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if config.metrics.enabled && config.metrics.interval.is_zero() {
        return Err(ConfigError::invalid_value(
            "metrics",
            "interval",
            "must be greater than zero",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn parse(toml: &str) -> Result<Config> {
        Config::from_str(toml)
    }

    #[test]
    fn test_valid_minimal_config() {
        assert!(parse("").is_ok());
    }

    #[test]
    fn test_valid_full_config() {
        let toml = r#"
[record]
separator = ","
fields = ["ts", "host", "msg"]

[topology]
filter_workers = 2
sink_workers = 2
output_fields = ["host", "msg"]
shard_field = "host"

[source]
type = "file"
path = "in.log"

[sink]
type = "file"
dir = "out"
output = "fields"

[uploader]
type = "move"
destination = "archive"

[[filters]]
type = "drop"
field = "msg"
condition = "empty"

[validation]
required_fields = ["ts"]
"#;
        let config = parse(toml).unwrap();
        assert_eq!(config.filters.len(), 1);
        assert!(config.uploader.is_some());
    }

    #[test]
    fn test_duplicate_field_name() {
        let err = parse("[record]\nfields = [\"a\", \"a\"]").unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_too_many_fields() {
        let err = parse("[record]\nmax_fields = 1\nfields = [\"a\", \"b\"]").unwrap_err();
        assert!(err.to_string().contains("max_fields"));
    }

    #[test]
    fn test_unknown_output_field() {
        let toml = r#"
[record]
fields = ["a"]

[topology]
output_fields = ["b"]
"#;
        assert!(matches!(
            parse(toml),
            Err(ConfigError::UnknownField { section: "topology.output_fields", .. })
        ));
    }

    #[test]
    fn test_unknown_shard_field() {
        let toml = r#"
[record]
fields = ["a"]

[topology]
shard_field = "b"

[sink]
type = "null"
"#;
        assert!(matches!(
            parse(toml),
            Err(ConfigError::UnknownField { section: "topology.shard_field", .. })
        ));
    }

    #[test]
    fn test_shard_on_stdout_rejected() {
        let toml = r#"
[record]
fields = ["a"]

[topology]
shard_field = "a"
"#;
        let err = parse(toml).unwrap_err();
        assert!(err.to_string().contains("does not support sharding"));
    }

    #[test]
    fn test_fields_output_without_output_fields() {
        let toml = r#"
[sink]
type = "stdout"
output = "fields"
"#;
        let err = parse(toml).unwrap_err();
        assert!(err.to_string().contains("output_fields"));
    }

    #[test]
    fn test_zero_queue_size() {
        let err = parse("[topology]\nsink_queue_size = 0").unwrap_err();
        assert!(err.to_string().contains("sink_queue_size"));
    }

    #[test]
    fn test_zero_filter_workers() {
        let err = parse("[topology]\nfilter_workers = 0").unwrap_err();
        assert!(err.to_string().contains("filter_workers"));
    }

    #[test]
    fn test_missing_file_source_path() {
        let err = parse("[source]\ntype = \"file\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { component: "source", field: "path" }
        ));
    }

    #[test]
    fn test_missing_file_sink_dir() {
        let err = parse("[sink]\ntype = \"file\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { component: "sink", field: "dir" }
        ));
    }

    #[test]
    fn test_missing_uploader_destination() {
        let err = parse("[uploader]\ntype = \"move\"").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { component: "uploader", .. }
        ));
    }

    #[test]
    fn test_unknown_filter_type() {
        let err = parse("[[filters]]\ntype = \"regex\"").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFilterType(ref t) if t == "regex"));
    }

    #[test]
    fn test_unknown_required_field() {
        let toml = r#"
[record]
fields = ["a"]

[validation]
required_fields = ["z"]
"#;
        assert!(matches!(
            parse(toml),
            Err(ConfigError::UnknownField { section: "validation.required_fields", .. })
        ));
    }

    #[test]
    fn test_zero_metrics_interval() {
        let err = parse("[metrics]\ninterval = \"0s\"").unwrap_err();
        assert!(err.to_string().contains("interval"));

        assert!(parse("[metrics]\nenabled = false\ninterval = \"0s\"").is_ok());
    }
}
