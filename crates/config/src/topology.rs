//! Topology configuration
//!
//! Queue sizes, worker counts and routing of records to sink workers.
//! All fields have sensible defaults.

use serde::Deserialize;

/// What happens to a record when a filter returns an error
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OnErrorPolicy {
    /// Discard the record (default)
    #[default]
    Drop,
    /// Pass the record unchanged to the next stage
    Forward,
}

/// Topology configuration
///
/// # Example
///
/// ```toml
/// [topology]
/// input_queue_size = 16
/// sink_queue_size = 4096
/// filter_workers = 4
/// sink_workers = 2
/// output_fields = ["host", "message"]
/// shard_field = "host"
/// on_error = "forward"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TopologyConfig {
    /// Capacity of the source → filter queue, in batches
    /// Default: 64
    pub input_queue_size: usize,

    /// Capacity of each filter → sink queue, in records
    /// Default: 10000
    pub sink_queue_size: usize,

    /// Capacity of the sink → uploader queue, in requests
    /// Default: 64
    pub upload_queue_size: usize,

    /// Number of filter worker threads
    /// Default: None (auto = number of CPU cores)
    pub filter_workers: Option<usize>,

    /// Number of sink instances
    /// Default: 1
    pub sink_workers: usize,

    /// Fields projected into each output record, in order
    pub output_fields: Vec<String>,

    /// Field used to pin records to a sink worker
    pub shard_field: Option<String>,

    /// Filter error policy
    pub on_error: OnErrorPolicy,

    /// Install a Ctrl-C handler that stops the topology
    /// Default: true
    pub stop_on_interrupt: bool,

    /// Number of records pre-allocated in the record pool
    /// Default: None (sink_queue_size + 2 per filter worker)
    pub pool_size: Option<usize>,
}

impl Default for TopologyConfig {
    fn default() -> Self {
        Self {
            input_queue_size: 64,
            sink_queue_size: 10_000,
            upload_queue_size: 64,
            filter_workers: None,
            sink_workers: 1,
            output_fields: Vec::new(),
            shard_field: None,
            on_error: OnErrorPolicy::Drop,
            stop_on_interrupt: true,
            pool_size: None,
        }
    }
}

impl TopologyConfig {
    /// Get the effective number of filter workers
    ///
    /// Returns the configured value, or num_cpus if not set (auto mode).
    pub fn effective_filter_workers(&self) -> usize {
        self.filter_workers.unwrap_or_else(num_cpus)
    }

    /// Get the effective record pool size
    pub fn effective_pool_size(&self) -> usize {
        self.pool_size
            .unwrap_or_else(|| self.effective_filter_workers() * 2 + self.sink_queue_size.min(1024))
    }
}

/// Get the number of available CPUs, defaulting to 4 if detection fails
fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
