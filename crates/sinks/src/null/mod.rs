//! Null sink - discards all records
//!
//! Measures pipeline throughput without any I/O. Records are counted, then
//! dropped, which also releases their share of the source buffer.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use sluice_pipeline::{Topology, testing::VecSource};
//! use sluice_sinks::null::NullSink;
//!
//! let sink = Arc::new(NullSink::new());
//! let source = Arc::new(VecSource::from_lines(["a\nb\n"]));
//!
//! let mut topology = Topology::builder(source).sink(sink.clone()).build().unwrap();
//! topology.start().unwrap();
//! topology.wait().unwrap();
//!
//! assert_eq!(sink.metrics().snapshot().records_received, 2);
//! ```

use crossbeam::channel::{Receiver, Sender};
use sluice_metrics::{Counter, Stats};
use sluice_pipeline::{OutputRecord, Sink, UploadRequest};


/// Sink that counts and discards every record
#[derive(Debug, Default)]
pub struct NullSink {
    metrics: NullSinkMetrics,
}

/// Metrics for the null sink
#[derive(Debug, Default)]
pub struct NullSinkMetrics {
    /// Records received
    records_received: Counter,

    /// Bytes received, over fields and raw line
    bytes_received: Counter,
}

impl NullSinkMetrics {
    /// Record a received record
    #[inline]
    pub fn record(&self, bytes: u64) {
        self.records_received.inc();
        self.bytes_received.add(bytes);
    }

    /// Get snapshot of metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_received: self.records_received.get(),
            bytes_received: self.bytes_received.get(),
        }
    }
}

/// Point-in-time snapshot of null sink metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_received: u64,
    pub bytes_received: u64,
}

impl NullSink {
    /// Create a new null sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &NullSinkMetrics {
        &self.metrics
    }
}

/// Payload size of an output record
fn record_bytes(record: &OutputRecord) -> u64 {
    let fields: usize = record.fields.iter().map(|f| f.len()).sum();
    (fields + record.raw.as_ref().map_or(0, |r| r.len())) as u64
}

impl Sink for NullSink {
    fn run(&self, input: Receiver<OutputRecord>, _uploads: Sender<UploadRequest>) {
        tracing::debug!("null sink starting");

        for record in input.iter() {
            self.metrics.record(record_bytes(&record));
        }

        let snapshot = self.metrics.snapshot();
        tracing::debug!(
            records = snapshot.records_received,
            bytes = snapshot.bytes_received,
            "null sink shutting down"
        );
    }

    fn stats(&self) -> Stats {
        let snapshot = self.metrics.snapshot();
        let mut stats = Stats::with_counts(snapshot.records_received, 0, 0);
        stats.bag.counter("bytes", snapshot.bytes_received);
        stats
    }

    fn name(&self) -> &'static str {
        "null"
    }
}
