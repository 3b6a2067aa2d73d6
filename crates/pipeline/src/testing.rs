//! Test helpers
//!
//! In-memory components for exercising a topology without I/O.

use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use crossbeam::channel::{Receiver, Sender};
use parking_lot::Mutex;
use sluice_metrics::{Counter, Stats};

use crate::batch::{DataBatch, OutputMode, OutputRecord, UploadRequest};
use crate::component::{Sink, Source};
use crate::error::ComponentError;

/// Source that sends a fixed list of batches, then returns
///
/// Optionally fails after the last batch, to exercise the sticky error.
#[derive(Debug, Default)]
pub struct VecSource {
    batches: Mutex<Vec<DataBatch>>,
    fail_with: Option<String>,
    stopped: AtomicBool,
    sent: Counter,
    released: Counter,
}

impl VecSource {
    /// Source sending `batches` in order
    pub fn new(batches: Vec<DataBatch>) -> Self {
        Self {
            batches: Mutex::new(batches),
            ..Default::default()
        }
    }

    /// One batch per string
    pub fn from_lines<I, S>(batches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            batches
                .into_iter()
                .map(|s| DataBatch::new(Bytes::from(Into::<String>::into(s))))
                .collect(),
        )
    }

    /// Return an error after the last batch (builder style)
    pub fn fail_with(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Batches handed back by the filter workers
    pub fn released(&self) -> u64 {
        self.released.get()
    }

    /// Whether `stop` was called
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

impl Source for VecSource {
    fn run(&self, output: Sender<DataBatch>) -> Result<(), ComponentError> {
        let batches = std::mem::take(&mut *self.batches.lock());
        for batch in batches {
            if self.is_stopped() {
                break;
            }
            if output.send(batch).is_err() {
                break;
            }
            self.sent.inc();
        }

        match &self.fail_with {
            Some(message) => Err(ComponentError::failed(message.clone())),
            None => Ok(()),
        }
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    fn stats(&self) -> Stats {
        Stats::with_counts(self.sent.get(), 0, 0)
    }

    fn release_batch(&self, _batch: DataBatch) {
        self.released.inc();
    }

    fn name(&self) -> &'static str {
        "vec"
    }
}

/// Sink that keeps every record it receives
#[derive(Debug)]
pub struct CaptureSink {
    records: Mutex<Vec<OutputRecord>>,
    mode: OutputMode,
    sharding: bool,
}

impl CaptureSink {
    /// Capture sink reading `mode`
    pub fn new(mode: OutputMode) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            mode,
            sharding: true,
        }
    }

    /// Declare sharding unsupported (builder style)
    pub fn without_sharding(mut self) -> Self {
        self.sharding = false;
        self
    }

    /// Records received so far, in arrival order
    pub fn records(&self) -> Vec<OutputRecord> {
        self.records.lock().clone()
    }

    /// Raw projections received so far, as strings
    pub fn raw_lines(&self) -> Vec<String> {
        self.records
            .lock()
            .iter()
            .filter_map(|r| r.raw.as_ref())
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
            .collect()
    }

    /// Number of records received
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    /// Whether nothing was received
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl Sink for CaptureSink {
    fn run(&self, input: Receiver<OutputRecord>, _uploads: Sender<UploadRequest>) {
        for record in input.iter() {
            self.records.lock().push(record);
        }
    }

    fn stats(&self) -> Stats {
        Stats::with_counts(self.len() as u64, 0, 0)
    }

    fn supports_sharding(&self) -> bool {
        self.sharding
    }

    fn output_mode(&self) -> OutputMode {
        self.mode
    }

    fn name(&self) -> &'static str {
        "capture"
    }
}
