//! Collected stats snapshot and rate calculations
//!
//! This module contains the unified snapshot that holds pipeline counters
//! and per-component stats at a point in time, plus rate calculation
//! utilities for computing per-second rates between two collections.

use crate::Stats;
use serde::Serialize;
use std::fmt;
use std::time::{Duration, Instant};

/// Role a component plays in the topology
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentRole {
    Source,
    Filter,
    Sink,
    Uploader,
}

impl ComponentRole {
    /// Role name as shown in reports
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Filter => "filter",
            Self::Sink => "sink",
            Self::Uploader => "uploader",
        }
    }
}

impl fmt::Display for ComponentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSnapshot {
    /// Batches pulled from the source queue
    pub batches: u64,
    /// Bytes in those batches
    pub bytes: u64,
    /// Lines decoded into records
    pub records: u64,
    /// Lines that failed to parse
    pub malformed: u64,
    /// Records rejected by validation
    pub invalid: u64,
    /// Filter errors (all filters)
    pub filter_errors: u64,
    /// Records discarded by the chain
    pub dropped: u64,
    /// Output records handed to sinks
    pub emitted: u64,
    /// Sends that found a full sink queue and had to wait
    pub backpressure: u64,
}

/// Stats of all instances of one component type, merged
#[derive(Debug, Clone)]
pub struct CollectedComponent {
    /// Role in the topology
    pub role: ComponentRole,
    /// Component type name (e.g., "file", "drop")
    pub component_type: String,
    /// Number of instances merged into `stats`
    pub instances: usize,
    /// Merged stats
    pub stats: Stats,
}

/// Complete stats collection at a point in time
#[derive(Debug, Clone, Default)]
pub struct CollectedStats {
    /// When this collection was taken
    pub timestamp: Option<Instant>,

    /// Orchestrator counters
    pub pipeline: Option<PipelineSnapshot>,

    /// Validation failures by offending field name
    pub invalid_fields: Vec<(String, u64)>,

    /// Per component type stats
    pub components: Vec<CollectedComponent>,
}

impl CollectedStats {
    /// Create a new empty collection stamped now
    pub fn new() -> Self {
        Self {
            timestamp: Some(Instant::now()),
            ..Default::default()
        }
    }

    /// Add a component entry, merging it with an existing entry of the same
    /// role and type
    pub fn add_component(&mut self, role: ComponentRole, component_type: &str, stats: &Stats) {
        if let Some(existing) = self
            .components
            .iter_mut()
            .find(|c| c.role == role && c.component_type == component_type)
        {
            existing.instances += 1;
            existing.stats.merge(stats);
            return;
        }

        self.components.push(CollectedComponent {
            role,
            component_type: component_type.to_string(),
            instances: 1,
            stats: stats.clone(),
        });
    }

    /// Find a component entry
    pub fn component(&self, role: ComponentRole, component_type: &str) -> Option<&CollectedComponent> {
        self.components
            .iter()
            .find(|c| c.role == role && c.component_type == component_type)
    }

    /// Calculate rates by comparing with a previous collection
    ///
    /// Returns None if either timestamp or pipeline snapshot is missing.
    pub fn rates(&self, previous: &CollectedStats) -> Option<StatsRates> {
        let current_ts = self.timestamp?;
        let previous_ts = previous.timestamp?;

        let elapsed = current_ts.duration_since(previous_ts);
        if elapsed.is_zero() {
            return None;
        }
        let elapsed_secs = elapsed.as_secs_f64();

        let current = self.pipeline?;
        let prev = previous.pipeline?;

        Some(StatsRates {
            elapsed,
            records_per_sec: rate(current.records, prev.records, elapsed_secs),
            bytes_per_sec: rate(current.bytes, prev.bytes, elapsed_secs),
            emitted_per_sec: rate(current.emitted, prev.emitted, elapsed_secs),
        })
    }
}

/// Calculate rate per second
#[inline]
fn rate(current: u64, previous: u64, elapsed_secs: f64) -> f64 {
    let delta = current.saturating_sub(previous);
    delta as f64 / elapsed_secs
}

/// Calculated rates between two collections
#[derive(Debug, Clone, Copy)]
pub struct StatsRates {
    /// Time elapsed between collections
    pub elapsed: Duration,
    /// Records decoded per second
    pub records_per_sec: f64,
    /// Batch bytes per second
    pub bytes_per_sec: f64,
    /// Output records per second
    pub emitted_per_sec: f64,
}

/// Anything that can produce a [`CollectedStats`] on demand
///
/// Implemented by the topology; consumed by the reporter.
pub trait StatsCollector: Send + Sync {
    /// Take a snapshot of all stats
    fn collect(&self) -> CollectedStats;
}
