//! Sluice - Sources
//!
//! Reference sources producing `DataBatch` instances for a topology.
//!
//! # Available Sources
//!
//! - **stdin** - newline-delimited records from standard input
//! - **file** - newline-delimited records from a file, tagged with
//!   `source.path` and `source.mtime`
//! - **memory** - a fixed in-memory buffer, for replay and benchmarks
//!
//! # Design Principles
//!
//! - **Pooled buffers**: batches are frozen `BytesMut` from a `BufferPool`
//!   and come back through `Source::release_batch`
//! - **Line-aligned batches**: a batch never splits a line
//! - **Blocking I/O**: sources run on their own thread, so reads block
//!   instead of going through a runtime
//!
//! # Example
//!
//! ```
//! use crossbeam::channel;
//! use sluice_pipeline::Source;
//! use sluice_sources::MemorySource;
//!
//! let source = MemorySource::new("a,1\nb,2\n");
//! let (tx, rx) = channel::unbounded();
//! source.run(tx).unwrap();
//!
//! assert_eq!(&rx.recv().unwrap().data[..], b"a,1\nb,2\n");
//! ```

use std::sync::Arc;

use sluice_config::SourceConfig;
use sluice_pipeline::Source;

mod buffer_pool;
mod memory;
mod metrics;
mod reader;

pub use buffer_pool::{BufferPool, BufferPoolMetrics, BufferPoolSnapshot};
pub use memory::MemorySource;
pub use metrics::SourceMetrics;
pub use reader::{ReaderInput, ReaderSource};

/// Build the source described by a `[source]` section
pub fn create_source(config: &SourceConfig) -> Arc<dyn Source> {
    tracing::debug!(source = config.type_name(), "creating source");
    Arc::new(ReaderSource::from_config(config))
}
