//! Source counters
//!
//! Shared by every reference source. Updated by the source thread, read by
//! the stats collector.

use sluice_metrics::{Counter, Stats};

/// Counters of one source
#[derive(Debug, Default)]
pub struct SourceMetrics {
    /// Batches handed to the topology
    pub batches_sent: Counter,

    /// Bytes handed to the topology
    pub bytes_sent: Counter,

    /// Read calls issued
    pub reads: Counter,

    /// Read errors
    pub errors: Counter,
}

impl SourceMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a batch handed to the topology
    #[inline]
    pub fn batch_sent(&self, bytes: usize) {
        self.batches_sent.inc();
        self.bytes_sent.add(bytes as u64);
    }

    /// Record one read call
    #[inline]
    pub fn read(&self) {
        self.reads.inc();
    }

    /// Record a read error
    #[inline]
    pub fn error(&self) {
        self.errors.inc();
    }

    /// Stats view: batches as processed, bytes and reads in the bag
    pub fn stats(&self) -> Stats {
        let mut stats = Stats::with_counts(self.batches_sent.get(), 0, self.errors.get());
        stats.bag.counter("bytes", self.bytes_sent.get());
        stats.bag.counter("reads", self.reads.get());
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sluice_metrics::MetricSample;

    #[test]
    fn test_stats_view() {
        let metrics = SourceMetrics::new();
        metrics.read();
        metrics.read();
        metrics.batch_sent(100);
        metrics.batch_sent(50);
        metrics.error();

        let stats = metrics.stats();
        assert_eq!(stats.processed, 2);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.bag.get("bytes"), Some(&MetricSample::Counter(150)));
        assert_eq!(stats.bag.get("reads"), Some(&MetricSample::Counter(2)));
    }
}
