//! Component contracts
//!
//! The four plugin roles of a topology. Sources, sinks and uploaders are
//! shared between the orchestrator and their worker thread as
//! `Arc<dyn …>`, so every method takes `&self`; components keep their
//! counters in atomics and their cancellation state in a token.
//!
//! The no-op bases ([`NoopSource`], [`DiscardSink`], [`NoopUploader`]) are
//! complete implementations meant for composition in tests and as the
//! default wiring.

use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use sluice_metrics::{Counter, MetricsClient, Stats, metrics_client};
use sluice_record::{FieldMap, Layout};

pub use sluice_record::{Validator, required_fields};

use crate::batch::{DataBatch, OutputMode, OutputRecord, UploadRequest};
use crate::error::ComponentError;

/// Produces batches of raw lines
pub trait Source: Send + Sync {
    /// Produce batches until the input ends, `stop` is called, or an error
    ///
    /// May block indefinitely (daemon) or return after finite work (batch
    /// job). Returning ends the pipeline either way. An error is kept as the
    /// topology's sticky error.
    fn run(&self, output: Sender<DataBatch>) -> Result<(), ComponentError>;

    /// Ask `run` to return; must be idempotent
    fn stop(&self);

    /// Stats since start
    fn stats(&self) -> Stats {
        Stats::new()
    }

    /// Take back a batch once every line was processed
    fn release_batch(&self, _batch: DataBatch) {}

    /// Type name for logs and stats
    fn name(&self) -> &'static str;
}

/// Consumes output records
pub trait Sink: Send + Sync {
    /// Consume records until the input queue is closed and drained
    ///
    /// Errors are handled and counted by the sink itself. Finished
    /// artifacts are announced on `uploads`.
    fn run(&self, input: Receiver<OutputRecord>, uploads: Sender<UploadRequest>);

    /// Stats since start
    fn stats(&self) -> Stats {
        Stats::new()
    }

    /// Whether several instances may each own a shard of the records
    fn supports_sharding(&self) -> bool {
        true
    }

    /// Which projection this sink reads
    fn output_mode(&self) -> OutputMode {
        OutputMode::Raw
    }

    /// Type name for logs and stats
    fn name(&self) -> &'static str;
}

/// Ships finished artifacts
pub trait Uploader: Send + Sync {
    /// Handle requests until the queue is closed and drained, or `stop`
    fn run(&self, input: Receiver<UploadRequest>) -> Result<(), ComponentError>;

    /// Ask `run` to return; must be idempotent
    fn stop(&self);

    /// Stats since start
    fn stats(&self) -> Stats {
        Stats::new()
    }

    /// Type name for logs and stats
    fn name(&self) -> &'static str;
}

/// Construction parameters shared by every component
#[derive(Clone)]
pub struct ComponentParams {
    /// Field name ↔ index mapping
    pub fields: Arc<FieldMap>,

    /// Record layout; `layout.factory()` creates empty records
    pub layout: Layout,

    /// Record check, if validation is configured
    pub validator: Option<Validator>,

    /// Handle for component-specific samples
    pub metrics: MetricsClient,
}

impl ComponentParams {
    /// Create params for a layout and field map
    pub fn new(layout: Layout, fields: Arc<FieldMap>) -> Self {
        Self {
            fields,
            layout,
            validator: None,
            metrics: metrics_client(),
        }
    }

    /// Attach a validator (builder style)
    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Fresh params for one more component, with its own metrics handle
    pub fn for_component(&self) -> Self {
        Self {
            metrics: metrics_client(),
            ..self.clone()
        }
    }

    /// Stats carrying this interval's snapshot of the metrics handle
    ///
    /// Histogram and timing samples are drained; see [`MetricsBag::snapshot`].
    ///
    /// [`MetricsBag::snapshot`]: sluice_metrics::MetricsBag::snapshot
    pub fn stats_with_bag(&self, processed: u64, filtered: u64, errors: u64) -> Stats {
        Stats::with_counts(processed, filtered, errors).with_bag(self.metrics.lock().snapshot())
    }
}

impl std::fmt::Debug for ComponentParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentParams")
            .field("fields", &self.fields)
            .field("layout", &self.layout)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Source that produces nothing and returns immediately
#[derive(Debug, Default)]
pub struct NoopSource;

impl Source for NoopSource {
    fn run(&self, _output: Sender<DataBatch>) -> Result<(), ComponentError> {
        Ok(())
    }

    fn stop(&self) {}

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Sink that counts and discards every record
#[derive(Debug, Default)]
pub struct DiscardSink {
    received: Counter,
}

impl DiscardSink {
    /// Create a new discard sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Records received so far
    pub fn received(&self) -> u64 {
        self.received.get()
    }
}

impl Sink for DiscardSink {
    fn run(&self, input: Receiver<OutputRecord>, _uploads: Sender<UploadRequest>) {
        for _ in input.iter() {
            self.received.inc();
        }
    }

    fn stats(&self) -> Stats {
        Stats::with_counts(self.received.get(), 0, 0)
    }

    fn name(&self) -> &'static str {
        "discard"
    }
}

/// Uploader that acknowledges and discards every request
///
/// Used as the pass-through consumer when no uploader is configured, so
/// sinks never block on the upload queue.
#[derive(Debug, Default)]
pub struct NoopUploader {
    received: Counter,
}

impl NoopUploader {
    /// Create a new noop uploader
    pub fn new() -> Self {
        Self::default()
    }
}

impl Uploader for NoopUploader {
    fn run(&self, input: Receiver<UploadRequest>) -> Result<(), ComponentError> {
        for _ in input.iter() {
            self.received.inc();
        }
        Ok(())
    }

    fn stop(&self) {}

    fn stats(&self) -> Stats {
        Stats::with_counts(self.received.get(), 0, 0)
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
