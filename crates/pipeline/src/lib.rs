//! Sluice - Pipeline
//!
//! The topology that connects one source to sinks through a pool of filter
//! workers.
//!
//! # Architecture
//!
//! ```text
//!                        ┌─→ [filter worker] ─┐        ┌─→ sink queue 0 ─→ [sink 0] ─┐
//! [Source] → input queue ┼─→ [filter worker] ─┼─ shard ┤                             ├─→ upload queue → [Uploader]
//!                        └─→ [filter worker] ─┘        └─→ sink queue 1 ─→ [sink 1] ─┘
//! ```
//!
//! # Key Design
//!
//! - **Bounded queues everywhere**: a slow stage blocks its producers; no
//!   record is ever dropped for lack of space
//! - **Zero-copy lines**: records are parsed in place over the source batch
//!   and taken from a shared `RecordPool`
//! - **Deterministic sharding**: equal shard keys always reach the same sink
//! - **Strict drain order**: `wait()` joins stage by stage and closes each
//!   queue only after all of its producers have exited
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sluice_pipeline::testing::{CaptureSink, VecSource};
//! use sluice_pipeline::{OutputMode, Topology};
//!
//! let source = Arc::new(VecSource::from_lines(["hello,world,,\n"]));
//! let sink = Arc::new(CaptureSink::new(OutputMode::Raw));
//!
//! let mut topology = Topology::builder(source).sink(sink.clone()).build().unwrap();
//! topology.start().unwrap();
//! topology.wait().unwrap();
//!
//! assert_eq!(sink.raw_lines(), vec!["hello,world,,"]);
//! ```

mod batch;
mod component;
mod error;
mod interrupt;
mod metrics;
mod shard;
mod topology;
mod worker;

pub mod testing;

pub use batch::{DataBatch, Lines, OutputMode, OutputRecord, Projection, UploadRequest};
pub use component::{
    ComponentParams, DiscardSink, NoopSource, NoopUploader, Sink, Source, Uploader, Validator,
    required_fields,
};
pub use error::{ComponentError, Result, TopologyError};
pub use metrics::TopologyMetrics;
pub use shard::{Dispatcher, ShardFn, ShardRegistry, field_hash};
pub use topology::{
    DEFAULT_INPUT_QUEUE_SIZE, DEFAULT_SINK_QUEUE_SIZE, DEFAULT_UPLOAD_QUEUE_SIZE, StopHandle,
    Topology, TopologyBuilder, TopologyCollector, TopologyState,
};

// Re-export key types from dependencies for convenience
pub use crossbeam::channel::{Receiver, Sender};
pub use sluice_transform::Chain;
