//! Sluice Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use sluice_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[sink]\ntype = \"null\"").unwrap();
//! assert_eq!(config.sink.type_name(), "null");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [record]
//! separator = ","
//! fields = ["ts", "host", "message"]
//!
//! [topology]
//! filter_workers = 4
//! sink_workers = 2
//! shard_field = "host"
//!
//! [source]
//! type = "file"
//! path = "input.log"
//!
//! [sink]
//! type = "file"
//! dir = "out/"
//!
//! [[filters]]
//! type = "drop"
//! field = "message"
//! condition = "empty"
//! ```

mod error;
mod filters;
mod logging;
mod metrics;
mod record;
mod sinks;
mod sources;
mod topology;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use filters::{FilterInstanceConfig, KNOWN_FILTER_TYPES, is_known_filter_type};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use record::{RecordConfig, Separator, ValidationConfig};
pub use sinks::{
    FileSinkConfig, MoveUploaderConfig, NullSinkConfig, SinkConfig, SinkOutput,
    StdoutSinkConfig, UploaderConfig,
};
pub use sources::{FileSourceConfig, SourceConfig, StdinSourceConfig};
pub use topology::{OnErrorPolicy, TopologyConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Stats reporting configuration
    pub metrics: MetricsConfig,

    /// Record layout and field names
    pub record: RecordConfig,

    /// Queue sizes, worker counts, projection and sharding
    pub topology: TopologyConfig,

    /// Data source
    pub source: SourceConfig,

    /// Data sink
    pub sink: SinkConfig,

    /// Optional uploader for finished sink artifacts
    pub uploader: Option<UploaderConfig>,

    /// Filter chain, in order
    pub filters: Vec<FilterInstanceConfig>,

    /// Record validation rules
    pub validation: ValidationConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML or fails
    /// validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    ///
    /// Run automatically by `from_str` and `from_file`; call it again after
    /// mutating a config in code.
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }

    /// Names of the enabled filters, in chain order
    pub fn enabled_filters(&self) -> Vec<&str> {
        self.filters
            .iter()
            .filter(|f| f.enabled)
            .map(|f| f.filter_type.as_str())
            .collect()
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
