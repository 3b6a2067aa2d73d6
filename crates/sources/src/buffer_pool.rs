//! Lock-free pool of batch buffers
//!
//! A source fills a `BytesMut` from the pool, freezes it into a
//! `DataBatch`, and gets it back through `Source::release_batch` once a
//! filter worker is done with the batch. The buffer only returns to the
//! pool when no record or output still references it; otherwise it is
//! dropped and a fresh one is allocated on the next miss.
//!
//! # Example
//!
//! ```
//! use sluice_sources::BufferPool;
//!
//! let pool = BufferPool::new(4, 1024);
//!
//! let mut buf = pool.get();
//! buf.extend_from_slice(b"a,b\n");
//! let data = buf.freeze();
//!
//! // Sole owner again: the allocation goes back to the pool
//! assert!(pool.reclaim(data));
//! assert_eq!(pool.available(), 4);
//! ```

use bytes::{Bytes, BytesMut};
use crossbeam::queue::ArrayQueue;
use sluice_metrics::Counter;

#[cfg(test)]
#[path = "buffer_pool_test.rs"]
mod tests;

/// Lock-free pool of reusable `BytesMut` buffers
///
/// Pre-allocates buffers at construction time. When the pool is
/// exhausted, new buffers are allocated on demand.
pub struct BufferPool {
    queue: ArrayQueue<BytesMut>,
    buffer_capacity: usize,
    metrics: BufferPoolMetrics,
}

/// Buffer pool counters
#[derive(Debug, Default)]
pub struct BufferPoolMetrics {
    /// Buffers served from the pool
    pub hits: Counter,

    /// Buffers allocated because the pool was empty
    pub misses: Counter,

    /// Buffers returned to the pool
    pub returns: Counter,

    /// Buffers dropped (pool full, too small, or still shared)
    pub drops: Counter,
}

impl BufferPoolMetrics {
    /// Get snapshot of metrics
    pub fn snapshot(&self) -> BufferPoolSnapshot {
        BufferPoolSnapshot {
            hits: self.hits.get(),
            misses: self.misses.get(),
            returns: self.returns.get(),
            drops: self.drops.get(),
        }
    }

    /// Fraction of `get` calls served from the pool (1.0 before any call)
    pub fn hit_rate(&self) -> f64 {
        self.snapshot().hit_rate()
    }
}

/// Point-in-time snapshot of buffer pool metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BufferPoolSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub returns: u64,
    pub drops: u64,
}

impl BufferPoolSnapshot {
    /// Calculate hit rate from snapshot
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            1.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

impl BufferPool {
    /// Create a pool of `pool_size` buffers of `buffer_capacity` bytes
    ///
    /// A `pool_size` of zero is raised to one.
    pub fn new(pool_size: usize, buffer_capacity: usize) -> Self {
        let queue = ArrayQueue::new(pool_size.max(1));
        while queue.push(BytesMut::with_capacity(buffer_capacity)).is_ok() {}

        Self {
            queue,
            buffer_capacity,
            metrics: BufferPoolMetrics::default(),
        }
    }

    /// Get an empty buffer, from the pool if one is available
    #[inline]
    pub fn get(&self) -> BytesMut {
        match self.queue.pop() {
            Some(buf) => {
                self.metrics.hits.inc();
                buf
            }
            None => {
                self.metrics.misses.inc();
                BytesMut::with_capacity(self.buffer_capacity)
            }
        }
    }

    /// Return a buffer to the pool
    ///
    /// The buffer is cleared. Buffers that shrank below the pool's buffer
    /// capacity, or that do not fit, are dropped.
    #[inline]
    pub fn put(&self, mut buf: BytesMut) {
        buf.clear();

        if buf.capacity() < self.buffer_capacity {
            self.metrics.drops.inc();
            return;
        }
        match self.queue.push(buf) {
            Ok(()) => self.metrics.returns.inc(),
            Err(_) => self.metrics.drops.inc(),
        }
    }

    /// Take back the allocation of a frozen batch
    ///
    /// Returns `true` if `data` was the last reference and its buffer went
    /// back to the pool.
    pub fn reclaim(&self, data: Bytes) -> bool {
        match data.try_into_mut() {
            Ok(buf) => {
                let before = self.metrics.returns.get();
                self.put(buf);
                self.metrics.returns.get() > before
            }
            Err(_) => {
                self.metrics.drops.inc();
                false
            }
        }
    }

    /// Buffers currently available
    #[inline]
    pub fn available(&self) -> usize {
        self.queue.len()
    }

    /// Maximum number of pooled buffers
    #[inline]
    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }

    /// Capacity of each buffer
    #[inline]
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_capacity
    }

    /// Pool counters
    #[inline]
    pub fn metrics(&self) -> &BufferPoolMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferPool")
            .field("available", &self.available())
            .field("capacity", &self.capacity())
            .field("buffer_capacity", &self.buffer_capacity)
            .finish()
    }
}
