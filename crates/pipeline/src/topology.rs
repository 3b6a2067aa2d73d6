//! Topology - the pipeline orchestrator
//!
//! Owns the bounded queues between stages, spawns the worker threads and
//! runs the start/stop/drain lifecycle.
//!
//! # Lifecycle
//!
//! ```text
//! Constructed --start()--> Started --wait()--> Draining --> Terminated
//! ```
//!
//! `wait()` drains in strict order so no stage ever pushes to a closed
//! queue:
//!
//! 1. join the source, close the source queue
//! 2. join the filter workers, close the sink queues
//! 3. join the sinks, close the upload queue
//! 4. join the uploader
//!
//! A queue closes when its last sender is dropped. The topology keeps the
//! master sender of every queue and drops it only after all producers of
//! that queue have been joined.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use sluice_config::TopologyConfig;
use sluice_metrics::{CollectedStats, ComponentRole, StatsCollector};
use sluice_record::{FieldMap, Layout, RecordPool};
use sluice_transform::Chain;

use crate::batch::{DataBatch, OutputMode, OutputRecord, Projection, UploadRequest};
use crate::component::{NoopUploader, Sink, Source, Uploader, Validator};
use crate::error::{ComponentError, Result, TopologyError};
use crate::interrupt::InterruptWatcher;
use crate::metrics::TopologyMetrics;
use crate::shard::{Dispatcher, ShardRegistry};
use crate::worker::FilterWorker;

#[cfg(test)]
#[path = "topology_test.rs"]
mod tests;

/// Default capacity of the source → filter queue
pub const DEFAULT_INPUT_QUEUE_SIZE: usize = 64;

/// Default capacity of each sink queue
pub const DEFAULT_SINK_QUEUE_SIZE: usize = 10_000;

/// Default capacity of the sink → uploader queue
pub const DEFAULT_UPLOAD_QUEUE_SIZE: usize = 64;

/// Lifecycle state of a topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyState {
    /// Built, no thread running
    Constructed,
    /// Workers running
    Started,
    /// `wait()` is joining workers
    Draining,
    /// Every worker has exited
    Terminated,
}

impl TopologyState {
    /// State name as shown in errors and logs
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Constructed => "constructed",
            Self::Started => "started",
            Self::Draining => "draining",
            Self::Terminated => "terminated",
        }
    }
}

impl fmt::Display for TopologyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cloneable handle that stops a running topology
///
/// Stopping forwards to the source and the uploader, once. In-flight
/// filter and sink work is never interrupted.
#[derive(Clone)]
pub struct StopHandle {
    inner: Arc<StopInner>,
}

struct StopInner {
    source: Arc<dyn Source>,
    uploader: Arc<dyn Uploader>,
    stopped: AtomicBool,
}

impl StopHandle {
    fn new(source: Arc<dyn Source>, uploader: Arc<dyn Uploader>) -> Self {
        Self {
            inner: Arc::new(StopInner {
                source,
                uploader,
                stopped: AtomicBool::new(false),
            }),
        }
    }

    /// Ask the source and the uploader to return
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("stopping topology");
        self.inner.source.stop();
        self.inner.uploader.stop();
    }

    /// Whether a stop was requested
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::Acquire)
    }
}

impl fmt::Debug for StopHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopHandle")
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Builder for a [`Topology`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use sluice_pipeline::testing::{CaptureSink, VecSource};
/// use sluice_pipeline::{OutputMode, Topology};
/// use sluice_record::Layout;
///
/// let source = Arc::new(VecSource::from_lines(["a,b\nc,d\n"]));
/// let sink = Arc::new(CaptureSink::new(OutputMode::Raw));
///
/// let mut topology = Topology::builder(source)
///     .layout(Layout::new(b',', 8).unwrap())
///     .sink(sink.clone())
///     .filter_workers(2)
///     .build()
///     .unwrap();
///
/// topology.start().unwrap();
/// topology.wait().unwrap();
/// assert_eq!(sink.len(), 2);
/// ```
pub struct TopologyBuilder {
    source: Arc<dyn Source>,
    sinks: Vec<Arc<dyn Sink>>,
    uploader: Option<Arc<dyn Uploader>>,
    chain: Chain,
    layout: Layout,
    fields: Arc<FieldMap>,
    validator: Option<Validator>,
    output_fields: Vec<String>,
    shard_field: Option<String>,
    shards: ShardRegistry,
    input_queue_size: usize,
    sink_queue_size: usize,
    upload_queue_size: usize,
    filter_workers: usize,
    pool_size: Option<usize>,
    stop_on_interrupt: bool,
}

impl TopologyBuilder {
    /// Start a topology fed by `source`
    pub fn new(source: Arc<dyn Source>) -> Self {
        Self {
            source,
            sinks: Vec::new(),
            uploader: None,
            chain: Chain::empty(),
            layout: Layout::default(),
            fields: Arc::new(FieldMap::default()),
            validator: None,
            output_fields: Vec::new(),
            shard_field: None,
            shards: ShardRegistry::new(),
            input_queue_size: DEFAULT_INPUT_QUEUE_SIZE,
            sink_queue_size: DEFAULT_SINK_QUEUE_SIZE,
            upload_queue_size: DEFAULT_UPLOAD_QUEUE_SIZE,
            filter_workers: 1,
            pool_size: None,
            stop_on_interrupt: false,
        }
    }

    /// Apply the `[topology]` section
    ///
    /// Sink replication is the caller's business: it decides how many sink
    /// instances to add.
    pub fn config(mut self, config: &TopologyConfig) -> Self {
        self.input_queue_size = config.input_queue_size;
        self.sink_queue_size = config.sink_queue_size;
        self.upload_queue_size = config.upload_queue_size;
        self.filter_workers = config.effective_filter_workers();
        self.pool_size = Some(config.effective_pool_size());
        self.output_fields = config.output_fields.clone();
        self.shard_field = config.shard_field.clone();
        self.stop_on_interrupt = config.stop_on_interrupt;
        self
    }

    /// Record layout
    pub fn layout(mut self, layout: Layout) -> Self {
        self.layout = layout;
        self
    }

    /// Field name ↔ index mapping
    pub fn fields(mut self, fields: Arc<FieldMap>) -> Self {
        self.fields = fields;
        self
    }

    /// Filter chain shared by every filter worker
    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = chain;
        self
    }

    /// Add one sink instance (one sink worker)
    pub fn sink(mut self, sink: Arc<dyn Sink>) -> Self {
        self.sinks.push(sink);
        self
    }

    /// Add several sink instances
    pub fn sinks(mut self, sinks: impl IntoIterator<Item = Arc<dyn Sink>>) -> Self {
        self.sinks.extend(sinks);
        self
    }

    /// Uploader fed by the sinks' upload requests
    pub fn uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Record check run before the chain
    pub fn validator(mut self, validator: Validator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Fields projected for sinks that read fields, in order
    pub fn output_fields<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_fields = names.into_iter().map(Into::into).collect();
        self
    }

    /// Shard records over the sinks by this field
    pub fn shard_field(mut self, name: impl Into<String>) -> Self {
        self.shard_field = Some(name.into());
        self
    }

    /// Custom shard functions
    pub fn shards(mut self, shards: ShardRegistry) -> Self {
        self.shards = shards;
        self
    }

    /// Capacity of the source → filter queue
    pub fn input_queue_size(mut self, size: usize) -> Self {
        self.input_queue_size = size;
        self
    }

    /// Capacity of each sink queue
    pub fn sink_queue_size(mut self, size: usize) -> Self {
        self.sink_queue_size = size;
        self
    }

    /// Capacity of the upload queue
    pub fn upload_queue_size(mut self, size: usize) -> Self {
        self.upload_queue_size = size;
        self
    }

    /// Number of filter worker threads
    pub fn filter_workers(mut self, workers: usize) -> Self {
        self.filter_workers = workers;
        self
    }

    /// Number of pooled records
    pub fn pool_size(mut self, size: usize) -> Self {
        self.pool_size = Some(size);
        self
    }

    /// Stop on Ctrl-C
    pub fn stop_on_interrupt(mut self, enabled: bool) -> Self {
        self.stop_on_interrupt = enabled;
        self
    }

    /// Validate the wiring and allocate queues
    pub fn build(self) -> Result<Topology> {
        if self.sinks.is_empty() {
            return Err(TopologyError::NoSink);
        }
        for (name, value) in [
            ("input_queue_size", self.input_queue_size),
            ("sink_queue_size", self.sink_queue_size),
            ("upload_queue_size", self.upload_queue_size),
            ("filter_workers", self.filter_workers),
        ] {
            if value == 0 {
                return Err(TopologyError::InvalidSize { name });
            }
        }

        let output_fields = self
            .output_fields
            .iter()
            .map(|name| {
                self.fields
                    .index_of(name)
                    .ok_or_else(|| TopologyError::UnknownField {
                        role: "output",
                        field: name.clone(),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let mode = self
            .sinks
            .iter()
            .map(|s| s.output_mode())
            .reduce(OutputMode::union)
            .unwrap_or_default();
        if mode.needs_fields() && output_fields.is_empty() {
            let sink = self
                .sinks
                .iter()
                .find(|s| s.output_mode().needs_fields())
                .map_or("unknown", |s| s.name());
            return Err(TopologyError::MissingOutputFields { sink });
        }

        let dispatcher = match &self.shard_field {
            Some(name) => {
                let field = self
                    .fields
                    .index_of(name)
                    .ok_or_else(|| TopologyError::UnknownField {
                        role: "shard",
                        field: name.clone(),
                    })?;
                if let Some(sink) = self.sinks.iter().find(|s| !s.supports_sharding()) {
                    return Err(TopologyError::ShardingUnsupported { sink: sink.name() });
                }
                Dispatcher::sharded(self.shards.get(field), self.sinks.len())
            }
            None => Dispatcher::single(),
        };

        let (source_tx, source_rx) = channel::bounded(self.input_queue_size);
        let (sink_txs, sink_rxs): (Vec<_>, Vec<_>) = (0..dispatcher.queues())
            .map(|_| channel::bounded(self.sink_queue_size))
            .unzip();
        let (upload_tx, upload_rx) = channel::bounded(self.upload_queue_size);

        let pool_size = self.pool_size.unwrap_or_else(|| {
            self.filter_workers * 2 + self.sink_queue_size.min(1024)
        });
        let pool = Arc::new(RecordPool::new(pool_size, self.layout.factory()));

        let has_uploader = self.uploader.is_some();
        let uploader = self
            .uploader
            .unwrap_or_else(|| Arc::new(NoopUploader::new()));
        let stop = StopHandle::new(Arc::clone(&self.source), Arc::clone(&uploader));

        tracing::info!(
            source = self.source.name(),
            sinks = self.sinks.len(),
            filter_workers = self.filter_workers,
            filters = ?self.chain.names(),
            sharded = dispatcher.is_sharded(),
            uploader = has_uploader.then(|| uploader.name()),
            "topology built"
        );

        Ok(Topology {
            state: TopologyState::Constructed,
            source: self.source,
            sinks: self.sinks,
            uploader,
            chain: Arc::new(self.chain),
            pool,
            validator: self.validator,
            projection: Arc::new(Projection::new(output_fields, mode)),
            dispatcher,
            metrics: Arc::new(TopologyMetrics::new(self.layout.max_fields())),
            fields: self.fields,
            filter_workers: self.filter_workers,
            stop_on_interrupt: self.stop_on_interrupt,
            stop,
            queues: Queues {
                source_tx: Some(source_tx),
                source_rx: Some(source_rx),
                sink_txs,
                sink_rxs,
                upload_tx: Some(upload_tx),
                upload_rx: Some(upload_rx),
            },
            workers: Workers::default(),
            error: None,
        })
    }
}

/// Master ends of every queue
struct Queues {
    source_tx: Option<Sender<DataBatch>>,
    source_rx: Option<Receiver<DataBatch>>,
    sink_txs: Vec<Sender<OutputRecord>>,
    sink_rxs: Vec<Receiver<OutputRecord>>,
    upload_tx: Option<Sender<UploadRequest>>,
    upload_rx: Option<Receiver<UploadRequest>>,
}

/// Join handles of running workers
#[derive(Default)]
struct Workers {
    uploader: Option<JoinHandle<std::result::Result<(), ComponentError>>>,
    sinks: Vec<JoinHandle<()>>,
    filters: Vec<JoinHandle<()>>,
    source: Option<JoinHandle<std::result::Result<(), ComponentError>>>,
    interrupt: Option<InterruptWatcher>,
}

/// A wired pipeline: one source, N filter workers, M sinks, one uploader
pub struct Topology {
    state: TopologyState,
    source: Arc<dyn Source>,
    sinks: Vec<Arc<dyn Sink>>,
    uploader: Arc<dyn Uploader>,
    chain: Arc<Chain>,
    pool: Arc<RecordPool>,
    validator: Option<Validator>,
    projection: Arc<Projection>,
    dispatcher: Dispatcher,
    metrics: Arc<TopologyMetrics>,
    fields: Arc<FieldMap>,
    filter_workers: usize,
    stop_on_interrupt: bool,
    stop: StopHandle,
    queues: Queues,
    workers: Workers,
    error: Option<Arc<ComponentError>>,
}

impl Topology {
    /// Start building a topology fed by `source`
    pub fn builder(source: Arc<dyn Source>) -> TopologyBuilder {
        TopologyBuilder::new(source)
    }

    /// Current lifecycle state
    pub fn state(&self) -> TopologyState {
        self.state
    }

    /// Spawn every worker
    ///
    /// Order: uploader, sinks, filter workers, source, interrupt watcher.
    /// If a thread cannot be spawned, the workers already running are
    /// drained and the topology ends up terminated.
    pub fn start(&mut self) -> Result<()> {
        if self.state != TopologyState::Constructed {
            return Err(TopologyError::InvalidState {
                operation: "start",
                state: self.state,
            });
        }
        self.state = TopologyState::Started;

        if let Err(e) = self.spawn_workers() {
            tracing::error!(error = %e, "topology failed to start");
            self.stop.stop();
            self.drain();
            self.state = TopologyState::Terminated;
            return Err(e);
        }

        tracing::info!(
            filter_workers = self.filter_workers,
            sink_workers = self.sinks.len(),
            "topology started"
        );
        Ok(())
    }

    fn spawn_workers(&mut self) -> Result<()> {
        // Uploader, or a pass-through drain so sinks never block
        if let Some(input) = self.queues.upload_rx.take() {
            let uploader = Arc::clone(&self.uploader);
            self.workers.uploader = Some(spawn("sluice-uploader".into(), move || {
                uploader.run(input)
            })?);
        }

        // Sinks: one queue each when sharded, otherwise all share queue 0
        let sink_rxs = std::mem::take(&mut self.queues.sink_rxs);
        let upload_tx = self.queues.upload_tx.clone();
        for (i, sink) in self.sinks.iter().enumerate() {
            let input = sink_rxs[i % sink_rxs.len()].clone();
            let Some(uploads) = upload_tx.clone() else {
                break;
            };
            let sink = Arc::clone(sink);
            self.workers.sinks.push(spawn(format!("sluice-sink-{i}"), move || {
                tracing::debug!(sink = sink.name(), worker = i, "sink started");
                sink.run(input, uploads);
                tracing::debug!(sink = sink.name(), worker = i, "sink stopped");
            })?);
        }
        drop(upload_tx);
        drop(sink_rxs);

        // Filter workers
        if let Some(input) = self.queues.source_rx.take() {
            for id in 0..self.filter_workers {
                let worker = FilterWorker {
                    id,
                    input: input.clone(),
                    outputs: self.queues.sink_txs.clone(),
                    source: Arc::clone(&self.source),
                    chain: Arc::clone(&self.chain),
                    pool: Arc::clone(&self.pool),
                    validator: self.validator.clone(),
                    projection: Arc::clone(&self.projection),
                    dispatcher: self.dispatcher.clone(),
                    metrics: Arc::clone(&self.metrics),
                };
                self.workers
                    .filters
                    .push(spawn(format!("sluice-filter-{id}"), move || worker.run())?);
            }
        }

        // Source
        if let Some(output) = self.queues.source_tx.clone() {
            let source = Arc::clone(&self.source);
            self.workers.source = Some(spawn("sluice-source".into(), move || {
                tracing::debug!(source = source.name(), "source started");
                let result = source.run(output);
                tracing::debug!(source = source.name(), ok = result.is_ok(), "source returned");
                result
            })?);
        }

        if self.stop_on_interrupt {
            let watcher = InterruptWatcher::spawn(self.stop.clone()).map_err(|source| {
                TopologyError::Spawn {
                    worker: "sluice-interrupt".into(),
                    source,
                }
            })?;
            self.workers.interrupt = Some(watcher);
        }

        Ok(())
    }

    /// Ask the source and the uploader to stop; idempotent
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// Handle to stop the topology from another thread
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Wait for the pipeline to drain
    ///
    /// Returns once the source has returned and every record it produced
    /// went through the sinks. A source error is returned here and stays
    /// available through [`Topology::error`].
    pub fn wait(&mut self) -> Result<()> {
        if self.state != TopologyState::Started {
            return Err(TopologyError::InvalidState {
                operation: "wait for",
                state: self.state,
            });
        }
        self.state = TopologyState::Draining;
        self.drain();
        self.state = TopologyState::Terminated;

        let snapshot = self.metrics.snapshot();
        tracing::info!(
            records = snapshot.records,
            emitted = snapshot.emitted,
            malformed = snapshot.malformed,
            invalid = snapshot.invalid,
            dropped = snapshot.dropped,
            "topology terminated"
        );

        match &self.error {
            Some(error) => Err(TopologyError::Source(Arc::clone(error))),
            None => Ok(()),
        }
    }

    /// Join workers stage by stage, closing each queue after its producers
    fn drain(&mut self) {
        // 1. Source, then close the source queue
        if let Some(handle) = self.workers.source.take() {
            let result = handle.join().unwrap_or_else(|payload| {
                Err(ComponentError::Panicked {
                    component: self.source.name(),
                    message: panic_message(payload),
                })
            });
            if let Err(e) = result {
                tracing::error!(source = self.source.name(), error = %e, "source failed");
                self.error = Some(Arc::new(e));
            }
        }
        self.queues.source_tx = None;
        self.queues.source_rx = None;

        // 2. Filter workers, then close the sink queues
        for handle in self.workers.filters.drain(..) {
            if let Err(payload) = handle.join() {
                tracing::error!(message = %panic_message(payload), "filter worker panicked");
            }
        }
        self.queues.sink_txs.clear();
        self.queues.sink_rxs.clear();

        // 3. Sinks, then close the upload queue
        for handle in self.workers.sinks.drain(..) {
            if let Err(payload) = handle.join() {
                tracing::error!(message = %panic_message(payload), "sink worker panicked");
            }
        }
        self.queues.upload_tx = None;
        self.queues.upload_rx = None;

        // 4. Uploader
        if let Some(handle) = self.workers.uploader.take() {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::error!(uploader = self.uploader.name(), error = %e, "uploader failed")
                }
                Err(payload) => {
                    tracing::error!(message = %panic_message(payload), "uploader panicked")
                }
            }
        }

        if let Some(watcher) = self.workers.interrupt.take() {
            watcher.shutdown();
        }
    }

    /// The sticky source error, if the source failed
    pub fn error(&self) -> Option<&Arc<ComponentError>> {
        self.error.as_ref()
    }

    /// Orchestrator counters
    pub fn metrics(&self) -> &TopologyMetrics {
        &self.metrics
    }

    /// Whether records are sharded over the sinks
    pub fn is_sharded(&self) -> bool {
        self.dispatcher.is_sharded()
    }

    /// Number of sink queues
    pub fn sink_queue_count(&self) -> usize {
        self.dispatcher.queues()
    }

    /// Projection mode computed from the sinks
    pub fn output_mode(&self) -> OutputMode {
        self.projection.mode()
    }

    /// Stats collector over every component of this topology
    ///
    /// Stays valid after the topology is dropped.
    pub fn collector(&self) -> TopologyCollector {
        TopologyCollector {
            source: Arc::clone(&self.source),
            sinks: self.sinks.clone(),
            uploader: Arc::clone(&self.uploader),
            chain: Arc::clone(&self.chain),
            metrics: Arc::clone(&self.metrics),
            fields: Arc::clone(&self.fields),
        }
    }
}

impl Drop for Topology {
    fn drop(&mut self) {
        if self.state == TopologyState::Started {
            tracing::warn!("topology dropped while running, stopping and draining");
            self.stop.stop();
            self.drain();
            self.state = TopologyState::Terminated;
        }
    }
}

impl fmt::Debug for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Topology")
            .field("state", &self.state)
            .field("source", &self.source.name())
            .field("sinks", &self.sinks.len())
            .field("filter_workers", &self.filter_workers)
            .field("chain", &self.chain)
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}

/// Collects stats of every component of a topology
#[derive(Clone)]
pub struct TopologyCollector {
    source: Arc<dyn Source>,
    sinks: Vec<Arc<dyn Sink>>,
    uploader: Arc<dyn Uploader>,
    chain: Arc<Chain>,
    metrics: Arc<TopologyMetrics>,
    fields: Arc<FieldMap>,
}

impl StatsCollector for TopologyCollector {
    fn collect(&self) -> CollectedStats {
        let mut stats = CollectedStats::new();

        let mut pipeline = self.metrics.snapshot();
        pipeline.filter_errors = self.chain.error_count();
        stats.pipeline = Some(pipeline);
        stats.invalid_fields = self.metrics.invalid_by_name(&self.fields);

        stats.add_component(ComponentRole::Source, self.source.name(), &self.source.stats());
        for (name, filter_stats) in self.chain.stats() {
            stats.add_component(ComponentRole::Filter, name, &filter_stats);
        }
        for sink in &self.sinks {
            stats.add_component(ComponentRole::Sink, sink.name(), &sink.stats());
        }
        stats.add_component(
            ComponentRole::Uploader,
            self.uploader.name(),
            &self.uploader.stats(),
        );
        stats
    }
}

fn spawn<T, F>(name: String, f: F) -> Result<JoinHandle<T>>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn(f)
        .map_err(|source| TopologyError::Spawn {
            worker: name,
            source,
        })
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
