//! Sluice - Metrics
//!
//! Stats collection, merging and reporting for a running topology.
//!
//! # Overview
//!
//! This crate provides:
//! - [`Stats`] snapshots with a [`MetricsBag`] of typed samples
//! - The merge algebra used to combine replicas of one stage
//! - [`CollectedStats`], the unified view the orchestrator produces
//! - A periodic [`StatsReporter`] with human and JSON formatters
//!
//! # Design Principles
//!
//! - **Lock-free hot path**: per-record counters are [`Counter`] atomics
//! - **Merge on read**: replicas keep their own stats; merging happens only
//!   when a report is collected
//! - **Loud on misuse**: an unknown metric kind prefix panics
//!
//! # Example
//!
//! ```
//! use sluice_metrics::{MetricSample, Stats};
//!
//! let mut a = Stats::with_counts(10, 1, 0);
//! a.bag.record("counter.rows", 10.0);
//! a.bag.record("gauge.lag", 2.0);
//!
//! let mut b = Stats::with_counts(5, 0, 1);
//! b.bag.record("counter.rows", 5.0);
//! b.bag.record("gauge.lag", 4.0);
//!
//! let merged = Stats::merged([&a, &b]);
//! assert_eq!(merged.processed, 15);
//! assert_eq!(merged.bag.get("rows"), Some(&MetricSample::Counter(15)));
//! assert_eq!(merged.bag.get("lag"), Some(&MetricSample::Gauge(3.0)));
//! ```

mod collected;
pub mod format;
mod reporter;
mod stats;

pub use collected::{
    CollectedComponent, CollectedStats, ComponentRole, PipelineSnapshot, StatsCollector,
    StatsRates,
};
pub use format::{HumanFormatter, JsonFormatter, StatsFormatter};
pub use reporter::{ReporterHandle, StatsReporter, StatsReporterBuilder};
pub use stats::{
    MetricKind, MetricSample, MetricsBag, MetricsClient, SampleSummary, Stats, metrics_client,
};

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering for performance)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Get the current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    /// Reset the counter to 0 and return the previous value
    #[inline]
    pub fn take(&self) -> u64 {
        self.0.swap(0, Ordering::Relaxed)
    }
}
