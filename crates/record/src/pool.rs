//! Lock-free record pool
//!
//! Recycles `Record` instances between filter workers so the per-line hot
//! path does not allocate offset tables or overlay arrays.
//!
//! # Example
//!
//! ```
//! use sluice_record::{Layout, RecordPool};
//!
//! let pool = RecordPool::new(4, Layout::default().factory());
//! let record = pool.get();
//! // ... parse, filter, project ...
//! pool.put(record);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::queue::ArrayQueue;

use crate::layout::RecordFactory;
use crate::record::Record;

#[cfg(test)]
#[path = "pool_test.rs"]
mod tests;

/// Thread-safe pool of reusable records
///
/// Pre-seeded from a `RecordFactory`. When the pool runs dry the factory is
/// called again; records returned to a full pool are dropped.
pub struct RecordPool {
    queue: ArrayQueue<Record>,
    factory: RecordFactory,
    metrics: PoolMetrics,
}

/// Pool hit/miss counters
#[derive(Debug, Default)]
pub struct PoolMetrics {
    /// Records served from the pool
    pub hits: AtomicU64,
    /// Records created by the factory because the pool was empty
    pub misses: AtomicU64,
    /// Records returned to the pool
    pub returns: AtomicU64,
    /// Records dropped because the pool was full
    pub drops: AtomicU64,
}

impl PoolMetrics {
    /// Get snapshot of metrics
    pub fn snapshot(&self) -> PoolSnapshot {
        PoolSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            returns: self.returns.load(Ordering::Relaxed),
            drops: self.drops.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pool metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub drops: u64,
}

impl PoolSnapshot {
    /// Fraction of `get` calls served without the factory (0.0 to 1.0)
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl RecordPool {
    /// Create a pool holding up to `pool_size` records, all pre-allocated
    pub fn new(pool_size: usize, factory: RecordFactory) -> Self {
        let queue = ArrayQueue::new(pool_size.max(1));
        while queue.push(factory()).is_ok() {}

        Self {
            queue,
            factory,
            metrics: PoolMetrics::default(),
        }
    }

    /// Take a record from the pool, creating one if it is empty
    #[inline]
    pub fn get(&self) -> Record {
        match self.queue.pop() {
            Some(record) => {
                self.metrics.hits.fetch_add(1, Ordering::Relaxed);
                record
            }
            None => {
                self.metrics.misses.fetch_add(1, Ordering::Relaxed);
                (self.factory)()
            }
        }
    }

    /// Clear a record and return it to the pool
    #[inline]
    pub fn put(&self, mut record: Record) {
        record.clear();
        match self.queue.push(record) {
            Ok(()) => {
                self.metrics.returns.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.drops.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Create a record straight from the factory, bypassing the pool
    #[inline]
    pub fn create(&self) -> Record {
        (self.factory)()
    }

    /// Records currently available
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Maximum number of pooled records
    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Pool counters
    #[inline]
    pub fn metrics(&self) -> &PoolMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for RecordPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordPool")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .finish()
    }
}
