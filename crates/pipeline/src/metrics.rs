//! Topology metrics
//!
//! Atomic counters updated by the filter workers.
//! All operations use relaxed ordering for maximum performance.

use std::sync::atomic::{AtomicU64, Ordering};

use sluice_metrics::PipelineSnapshot;
use sluice_record::{FieldIndex, FieldMap};

/// Counters of the parse → validate → chain → dispatch path
///
/// These metrics are eventually consistent, not real-time.
///
/// # Thread Safety
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug)]
pub struct TopologyMetrics {
    /// Batches pulled from the source queue
    batches: AtomicU64,

    /// Bytes in those batches
    bytes: AtomicU64,

    /// Lines parsed into records
    records: AtomicU64,

    /// Lines that were empty or failed to parse
    malformed: AtomicU64,

    /// Records rejected by the validator
    invalid: AtomicU64,

    /// Validator rejections by offending field
    invalid_by_field: Box<[AtomicU64]>,

    /// Records for which the chain emitted nothing
    dropped: AtomicU64,

    /// Output records pushed to a sink queue
    emitted: AtomicU64,

    /// Output records lost because every sink of their queue was gone
    undelivered: AtomicU64,

    /// Pushes that found their sink queue full
    backpressure: AtomicU64,
}

impl TopologyMetrics {
    /// Create metrics tracking invalid counts for `max_fields` fields
    pub fn new(max_fields: usize) -> Self {
        Self {
            batches: AtomicU64::new(0),
            bytes: AtomicU64::new(0),
            records: AtomicU64::new(0),
            malformed: AtomicU64::new(0),
            invalid: AtomicU64::new(0),
            invalid_by_field: (0..max_fields).map(|_| AtomicU64::new(0)).collect(),
            dropped: AtomicU64::new(0),
            emitted: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
            backpressure: AtomicU64::new(0),
        }
    }

    /// Record a batch pulled from the source queue
    #[inline]
    pub fn record_batch(&self, bytes: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// Record a parsed line
    #[inline]
    pub fn record_parsed(&self) {
        self.records.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an empty or unparsable line
    #[inline]
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a validation failure on `field`
    #[inline]
    pub fn record_invalid(&self, field: FieldIndex) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
        if let Some(counter) = self.invalid_by_field.get(field) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a record the chain emitted nothing for
    #[inline]
    pub fn record_dropped(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an output record pushed to a sink queue
    #[inline]
    pub fn record_emitted(&self) {
        self.emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an output record whose queue had no receiver left
    #[inline]
    pub fn record_undelivered(&self) {
        self.undelivered.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a push that found its queue full
    #[inline]
    pub fn record_backpressure(&self) {
        self.backpressure.fetch_add(1, Ordering::Relaxed);
    }

    /// Get records emitted count
    #[inline]
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Get undelivered count
    #[inline]
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }

    /// Get backpressure events count
    #[inline]
    pub fn backpressure(&self) -> u64 {
        self.backpressure.load(Ordering::Relaxed)
    }

    /// Validation failures of one field
    pub fn invalid_count(&self, field: FieldIndex) -> u64 {
        self.invalid_by_field
            .get(field)
            .map_or(0, |c| c.load(Ordering::Relaxed))
    }

    /// Non-zero validation failures by field name
    ///
    /// Fields without a name are reported by index.
    pub fn invalid_by_name(&self, fields: &FieldMap) -> Vec<(String, u64)> {
        self.invalid_by_field
            .iter()
            .enumerate()
            .filter_map(|(index, counter)| {
                let count = counter.load(Ordering::Relaxed);
                (count > 0).then(|| {
                    let name = fields
                        .name_of(index)
                        .map_or_else(|| format!("#{index}"), str::to_string);
                    (name, count)
                })
            })
            .collect()
    }

    /// Get a snapshot of all metrics
    ///
    /// Filter errors live in the chain and are filled in by the caller.
    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            records: self.records.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            filter_errors: 0,
            dropped: self.dropped.load(Ordering::Relaxed),
            emitted: self.emitted.load(Ordering::Relaxed),
            backpressure: self.backpressure.load(Ordering::Relaxed),
        }
    }
}
