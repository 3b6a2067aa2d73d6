//! Filter worker - parse, validate, filter and dispatch
//!
//! Each filter worker runs the full per-record path on its own thread:
//!
//! ```text
//! DataBatch → lines → Record (pooled) → validate → Chain → Projection → sink queue
//! ```
//!
//! Lines of one batch are processed in order. The worker exits once the
//! source queue is closed and drained.

use std::sync::Arc;

use crossbeam::channel::{Receiver, SendError, Sender, TrySendError};
use sluice_record::{Record, RecordPool};
use sluice_transform::Chain;

use crate::batch::{DataBatch, OutputRecord, Projection};
use crate::component::{Source, Validator};
use crate::metrics::TopologyMetrics;
use crate::shard::Dispatcher;

#[cfg(test)]
#[path = "worker_test.rs"]
mod tests;

/// One filter worker
pub(crate) struct FilterWorker {
    pub(crate) id: usize,
    pub(crate) input: Receiver<DataBatch>,
    pub(crate) outputs: Vec<Sender<OutputRecord>>,
    pub(crate) source: Arc<dyn Source>,
    pub(crate) chain: Arc<Chain>,
    pub(crate) pool: Arc<RecordPool>,
    pub(crate) validator: Option<Validator>,
    pub(crate) projection: Arc<Projection>,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) metrics: Arc<TopologyMetrics>,
}

impl FilterWorker {
    /// Process batches until the source queue is closed and drained
    pub(crate) fn run(self) {
        tracing::debug!(worker = self.id, "filter worker started");

        for batch in self.input.iter() {
            self.process_batch(&batch);
            self.source.release_batch(batch);
        }

        tracing::debug!(worker = self.id, "filter worker stopped");
    }

    fn process_batch(&self, batch: &DataBatch) {
        self.metrics.record_batch(batch.len());

        for line in batch.lines() {
            let mut record = self.pool.get();
            self.process_line(&mut record, line, batch);
            self.pool.put(record);
        }
    }

    fn process_line(&self, record: &mut Record, line: bytes::Bytes, batch: &DataBatch) {
        if record.parse(line, batch.metadata.clone()).is_err() {
            self.metrics.record_malformed();
            return;
        }
        self.metrics.record_parsed();

        if let Some(validator) = &self.validator
            && let Err(field) = validator(record)
        {
            self.metrics.record_invalid(field);
            return;
        }

        let mut reached = false;
        self.chain.run(record, &mut |r: &mut Record| {
            reached = true;
            self.deliver(r);
        });

        if !reached {
            self.metrics.record_dropped();
        }
    }

    /// Terminal stage: project, pick the shard and push
    ///
    /// Blocks while the selected queue is full.
    fn deliver(&self, record: &Record) {
        let output = self.projection.project(record);
        let queue = &self.outputs[self.dispatcher.select(record)];

        let sent = match queue.try_send(output) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(output)) => {
                self.metrics.record_backpressure();
                queue.send(output)
            }
            Err(TrySendError::Disconnected(output)) => Err(SendError(output)),
        };

        match sent {
            Ok(()) => self.metrics.record_emitted(),
            Err(_) => {
                if self.metrics.undelivered() == 0 {
                    tracing::warn!(worker = self.id, "sink queue has no consumer left, dropping output");
                }
                self.metrics.record_undelivered();
            }
        }
    }
}
