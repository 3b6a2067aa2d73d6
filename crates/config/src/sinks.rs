//! Sink configuration types
//!
//! A topology runs `topology.sink_workers` instances of a single sink
//! type. The sink type is selected with the `type` key.

use serde::Deserialize;
use std::path::PathBuf;

/// What a sink receives for each record
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkOutput {
    /// Projected output fields only
    Fields,
    /// The full serialized record (default)
    #[default]
    Raw,
    /// Both the projection and the serialized record
    Both,
}

impl SinkOutput {
    /// Whether this mode needs `topology.output_fields`
    pub fn needs_fields(self) -> bool {
        matches!(self, Self::Fields | Self::Both)
    }
}

/// Configuration for the topology sink
///
/// # Example
///
/// ```toml
/// [sink]
/// type = "file"
/// dir = "out/"
/// max_records = 100000
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SinkConfig {
    /// Write records to standard output
    Stdout(StdoutSinkConfig),

    /// Discard all records (for benchmarking)
    Null(NullSinkConfig),

    /// Write records to rotating files
    File(FileSinkConfig),
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self::Stdout(StdoutSinkConfig::default())
    }
}

impl SinkConfig {
    /// Get the sink type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Stdout(_) => "stdout",
            Self::Null(_) => "null",
            Self::File(_) => "file",
        }
    }

    /// Output mode requested by the sink
    pub fn output(&self) -> SinkOutput {
        match self {
            Self::Stdout(c) => c.output,
            Self::Null(_) => SinkOutput::Raw,
            Self::File(c) => c.output,
        }
    }

    /// Whether instances of this sink can each own a shard
    ///
    /// Stdout instances share one stream, so pinning records to an
    /// instance is meaningless.
    pub fn supports_sharding(&self) -> bool {
        !matches!(self, Self::Stdout(_))
    }
}

/// Stdout sink configuration
///
/// # Example
///
/// ```toml
/// [sink]
/// type = "stdout"
/// output = "fields"
/// field_delimiter = "\t"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StdoutSinkConfig {
    /// What to print for each record
    /// Default: raw
    pub output: SinkOutput,

    /// Delimiter placed between projected fields
    /// Default: "\t"
    pub field_delimiter: String,
}

impl Default for StdoutSinkConfig {
    fn default() -> Self {
        Self {
            output: SinkOutput::Raw,
            field_delimiter: "\t".into(),
        }
    }
}

/// Null sink configuration - discards all data
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NullSinkConfig {}

/// File sink configuration
///
/// Each sink instance writes `<prefix>-<instance>-<sequence>.log` files in
/// `dir`, rotating after `max_records` records. Every finished file is
/// handed to the uploader.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSinkConfig {
    /// Output directory (required)
    pub dir: PathBuf,

    /// File name prefix
    /// Default: "sluice"
    pub prefix: String,

    /// Records per file before rotating (0 = never rotate)
    /// Default: 0
    pub max_records: u64,

    /// What to write for each record
    /// Default: raw
    pub output: SinkOutput,

    /// Delimiter placed between projected fields
    /// Default: "\t"
    pub field_delimiter: String,

    /// Write buffer size (bytes)
    /// Default: 65536 (64KB)
    pub buffer_size: usize,
}

impl Default for FileSinkConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::new(),
            prefix: "sluice".into(),
            max_records: 0,
            output: SinkOutput::Raw,
            field_delimiter: "\t".into(),
            buffer_size: 64 * 1024,
        }
    }
}

/// Configuration for the optional uploader stage
///
/// # Example
///
/// ```toml
/// [uploader]
/// type = "move"
/// destination = "archive/"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UploaderConfig {
    /// Move finished files into a destination directory
    Move(MoveUploaderConfig),
}

impl UploaderConfig {
    /// Get the uploader type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Move(_) => "move",
        }
    }
}

/// Move uploader configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MoveUploaderConfig {
    /// Destination directory (required)
    pub destination: PathBuf,
}
