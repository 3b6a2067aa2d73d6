//! In-memory source
//!
//! Serves a fixed buffer of newline-delimited records, sliced zero-copy into
//! batches that end on line boundaries. Useful for benchmarks and for
//! replaying captured input.

use std::sync::Arc;

use bytes::Bytes;
use crossbeam::channel::Sender;
use sluice_metrics::Stats;
use sluice_pipeline::{ComponentError, DataBatch, Source};
use sluice_record::Metadata;
use tokio_util::sync::CancellationToken;

use crate::metrics::SourceMetrics;

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

/// Default batch size
const DEFAULT_BATCH_BYTES: usize = 64 * 1024;

/// Source replaying an in-memory buffer
#[derive(Debug)]
pub struct MemorySource {
    data: Bytes,
    batch_bytes: usize,
    repeat: usize,
    metadata: Option<Arc<Metadata>>,
    metrics: SourceMetrics,
    cancel: CancellationToken,
}

impl MemorySource {
    /// Source over `data`, sent once in batches of about 64KB
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            batch_bytes: DEFAULT_BATCH_BYTES,
            repeat: 1,
            metadata: None,
            metrics: SourceMetrics::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Target batch size; a longer line still goes out whole
    pub fn batch_bytes(mut self, batch_bytes: usize) -> Self {
        self.batch_bytes = batch_bytes.max(1);
        self
    }

    /// Send the whole buffer `times` times
    pub fn repeat(mut self, times: usize) -> Self {
        self.repeat = times;
        self
    }

    /// Attach metadata to every batch
    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(Arc::new(metadata));
        self
    }

    /// Source counters
    pub fn metrics(&self) -> &SourceMetrics {
        &self.metrics
    }

    /// End of the batch starting at `start`
    fn batch_end(&self, start: usize) -> usize {
        let len = self.data.len();
        let end = start.saturating_add(self.batch_bytes).min(len);
        if end == len {
            return len;
        }

        let window = &self.data[start..end];
        if let Some(pos) = window.iter().rposition(|&b| b == b'\n') {
            return start + pos + 1;
        }
        // Single line longer than a batch
        self.data[end..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(len, |pos| end + pos + 1)
    }
}

impl Source for MemorySource {
    fn run(&self, output: Sender<DataBatch>) -> Result<(), ComponentError> {
        for _ in 0..self.repeat {
            let mut start = 0;
            while start < self.data.len() {
                if self.cancel.is_cancelled() {
                    return Ok(());
                }

                let end = self.batch_end(start);
                let mut batch = DataBatch::new(self.data.slice(start..end));
                batch.metadata = self.metadata.clone();
                if output.send(batch).is_err() {
                    tracing::debug!(source = self.name(), "batch queue closed");
                    return Ok(());
                }
                self.metrics.batch_sent(end - start);
                start = end;
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.cancel.cancel();
    }

    fn stats(&self) -> Stats {
        self.metrics.stats()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
