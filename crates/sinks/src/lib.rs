//! Sluice - Sinks
//!
//! Reference sinks consuming `OutputRecord`s from a topology, and a local
//! uploader for the files they produce.
//!
//! # Available Sinks
//!
//! | Sink | Purpose | Shardable | Uploads |
//! |------|---------|-----------|---------|
//! | `null` | Benchmarking (discard all) | Yes | No |
//! | `stdout` | One line per record on stdout | No | No |
//! | `file` | Rotating line files | Yes | Yes |
//!
//! The `move` uploader renames finished files into a destination directory.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sluice_config::SinkConfig;
//! use sluice_pipeline::ComponentParams;
//! use sluice_record::{FieldMap, Layout};
//!
//! let config: SinkConfig = toml::from_str(r#"type = "null""#).unwrap();
//! let params = ComponentParams::new(Layout::default(), Arc::new(FieldMap::default()));
//!
//! let sinks = sluice_sinks::create_sinks(&config, 4, &params);
//! assert_eq!(sinks.len(), 4);
//! assert_eq!(sinks[0].name(), "null");
//! ```

use std::sync::Arc;

use sluice_config::{SinkConfig, UploaderConfig};
use sluice_pipeline::{ComponentParams, Sink, Uploader};

/// File sink - rotating line files
pub mod file;

/// Null sink - discards all data (for benchmarking)
pub mod null;

/// Stdout sink - one line per record
pub mod stdout;

/// Move uploader - ships finished files to a directory
pub mod uploader;

/// Shared sink utilities (line rendering, rate-limited logging)
pub mod util;

pub use file::{FileSink, FileSinkError, FileSinkMetrics};
pub use null::NullSink;
pub use stdout::StdoutSink;
pub use uploader::MoveUploader;
pub use util::LineFormat;

/// Build `count` instances of the sink described by a `[sink]` section
///
/// Every instance gets its own metrics handle. At least one instance is
/// built.
pub fn create_sinks(config: &SinkConfig, count: usize, params: &ComponentParams) -> Vec<Arc<dyn Sink>> {
    tracing::debug!(sink = config.type_name(), count, "creating sinks");

    (0..count.max(1))
        .map(|instance| -> Arc<dyn Sink> {
            match config {
                SinkConfig::Stdout(c) => Arc::new(StdoutSink::from_config(c)),
                SinkConfig::Null(_) => Arc::new(NullSink::new()),
                SinkConfig::File(c) => {
                    Arc::new(FileSink::new(c.clone(), instance, params.for_component()))
                }
            }
        })
        .collect()
}

/// Build the uploader described by an `[uploader]` section
pub fn create_uploader(config: &UploaderConfig) -> Arc<dyn Uploader> {
    tracing::debug!(uploader = config.type_name(), "creating uploader");

    match config {
        UploaderConfig::Move(c) => Arc::new(MoveUploader::from_config(c)),
    }
}
