//! Component stats snapshots and the metric merge algebra
//!
//! Every component reports a [`Stats`] snapshot: three fixed counts plus a
//! [`MetricsBag`] of named, typed samples. Snapshots from replicas of the
//! same stage are merged with a fixed algebra:
//!
//! | kind      | merge                  |
//! |-----------|------------------------|
//! | counter   | sum                    |
//! | delta     | sum                    |
//! | gauge     | pairwise average       |
//! | histogram | concatenate samples    |
//! | timing    | concatenate durations  |
//!
//! Sample names are encoded with a kind prefix (`counter.rows`,
//! `gauge.queue_depth`). An unknown prefix, or the same name used with two
//! different kinds, is a programming error and panics.

use parking_lot::Mutex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle components use to record samples into a bag
pub type MetricsClient = Arc<Mutex<MetricsBag>>;

/// Create a fresh, empty metrics client
pub fn metrics_client() -> MetricsClient {
    Arc::new(Mutex::new(MetricsBag::new()))
}

/// Kind of a metric sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Counter,
    Delta,
    Gauge,
    Histogram,
    Timing,
}

impl MetricKind {
    const ALL: [MetricKind; 5] = [
        Self::Counter,
        Self::Delta,
        Self::Gauge,
        Self::Histogram,
        Self::Timing,
    ];

    /// Encoded name prefix, without the trailing dot
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Delta => "delta",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Timing => "timing",
        }
    }

    /// Split an encoded name into its kind and bare name
    ///
    /// Returns `None` when the prefix is not a known kind.
    pub fn parse(encoded: &str) -> Option<(MetricKind, &str)> {
        let (prefix, name) = encoded.split_once('.')?;
        let kind = Self::ALL.into_iter().find(|k| k.prefix() == prefix)?;
        Some((kind, name))
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// A typed metric sample
#[derive(Debug, Clone, PartialEq)]
pub enum MetricSample {
    /// Monotonic count
    Counter(u64),
    /// Signed change since the last report
    Delta(i64),
    /// Point-in-time value
    Gauge(f64),
    /// Raw observations
    Histogram(Vec<f64>),
    /// Raw durations
    Timing(Vec<Duration>),
}

impl MetricSample {
    /// Kind of this sample
    pub fn kind(&self) -> MetricKind {
        match self {
            Self::Counter(_) => MetricKind::Counter,
            Self::Delta(_) => MetricKind::Delta,
            Self::Gauge(_) => MetricKind::Gauge,
            Self::Histogram(_) => MetricKind::Histogram,
            Self::Timing(_) => MetricKind::Timing,
        }
    }

    /// Merge another sample of the same kind into this one
    ///
    /// # Panics
    ///
    /// Panics if the kinds differ.
    pub fn merge(&mut self, other: &MetricSample) {
        match (self, other) {
            (Self::Counter(a), Self::Counter(b)) => *a = a.saturating_add(*b),
            (Self::Delta(a), Self::Delta(b)) => *a = a.saturating_add(*b),
            (Self::Gauge(a), Self::Gauge(b)) => *a = (*a + *b) / 2.0,
            (Self::Histogram(a), Self::Histogram(b)) => a.extend_from_slice(b),
            (Self::Timing(a), Self::Timing(b)) => a.extend_from_slice(b),
            (this, other) => panic!(
                "cannot merge {} sample into {} sample",
                other.kind(),
                this.kind()
            ),
        }
    }

    /// Summary used by formatters: (count, min, max, mean)
    ///
    /// Timing values are reported in milliseconds. Scalar samples report
    /// themselves as a single observation.
    pub fn summary(&self) -> SampleSummary {
        match self {
            Self::Counter(v) => SampleSummary::single(*v as f64),
            Self::Delta(v) => SampleSummary::single(*v as f64),
            Self::Gauge(v) => SampleSummary::single(*v),
            Self::Histogram(values) => SampleSummary::from_values(values.iter().copied()),
            Self::Timing(values) => {
                SampleSummary::from_values(values.iter().map(|d| d.as_nanos() as f64 / 1_000_000.0))
            }
        }
    }
}

/// Aggregate view of a sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SampleSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl SampleSummary {
    fn single(value: f64) -> Self {
        Self {
            count: 1,
            min: value,
            max: value,
            mean: value,
        }
    }

    fn from_values(values: impl Iterator<Item = f64>) -> Self {
        let mut summary = Self {
            count: 0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            mean: 0.0,
        };
        let mut sum = 0.0;
        for value in values {
            summary.count += 1;
            summary.min = summary.min.min(value);
            summary.max = summary.max.max(value);
            sum += value;
        }
        if summary.count == 0 {
            return Self::default();
        }
        summary.mean = sum / summary.count as f64;
        summary
    }
}

/// Named collection of typed samples
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsBag {
    samples: BTreeMap<String, MetricSample>,
}

impl MetricsBag {
    /// Create an empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value under an encoded name (`<kind>.<name>`)
    ///
    /// Timing values are milliseconds. Counters and deltas accumulate,
    /// gauges keep the latest value, histograms and timings append.
    ///
    /// # Panics
    ///
    /// Panics on an unknown kind prefix, or if `name` was previously
    /// recorded with a different kind.
    pub fn record(&mut self, encoded: &str, value: f64) {
        let Some((kind, name)) = MetricKind::parse(encoded) else {
            panic!("unknown metric kind prefix in '{encoded}'");
        };
        let sample = match kind {
            MetricKind::Counter => MetricSample::Counter(value.max(0.0) as u64),
            MetricKind::Delta => MetricSample::Delta(value as i64),
            MetricKind::Gauge => MetricSample::Gauge(value),
            MetricKind::Histogram => MetricSample::Histogram(vec![value]),
            MetricKind::Timing => {
                MetricSample::Timing(vec![Duration::from_secs_f64(value.max(0.0) / 1000.0)])
            }
        };
        self.insert(name, sample);
    }

    /// Add to a counter
    pub fn counter(&mut self, name: &str, value: u64) {
        self.insert(name, MetricSample::Counter(value));
    }

    /// Add to a delta
    pub fn delta(&mut self, name: &str, value: i64) {
        self.insert(name, MetricSample::Delta(value));
    }

    /// Set a gauge
    pub fn gauge(&mut self, name: &str, value: f64) {
        self.insert(name, MetricSample::Gauge(value));
    }

    /// Append a histogram observation
    pub fn histogram(&mut self, name: &str, value: f64) {
        self.insert(name, MetricSample::Histogram(vec![value]));
    }

    /// Append a timing observation
    pub fn timing(&mut self, name: &str, value: Duration) {
        self.insert(name, MetricSample::Timing(vec![value]));
    }

    fn insert(&mut self, name: &str, sample: MetricSample) {
        match self.samples.get_mut(name) {
            Some(MetricSample::Gauge(current)) => match sample {
                MetricSample::Gauge(value) => *current = value,
                other => panic!("metric '{name}' recorded as {} but is a gauge", other.kind()),
            },
            Some(current) => current.merge(&sample),
            None => {
                self.samples.insert(name.to_string(), sample);
            }
        }
    }

    /// Merge another bag into this one using the merge algebra
    ///
    /// # Panics
    ///
    /// Panics if a name exists in both bags with different kinds.
    pub fn merge(&mut self, other: &MetricsBag) {
        for (name, sample) in &other.samples {
            match self.samples.get_mut(name) {
                Some(current) => current.merge(sample),
                None => {
                    self.samples.insert(name.clone(), sample.clone());
                }
            }
        }
    }

    /// Get a sample by bare name
    pub fn get(&self, name: &str) -> Option<&MetricSample> {
        self.samples.get(name)
    }

    /// Iterate samples in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &MetricSample)> {
        self.samples.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Check if the bag is empty
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Take all samples, leaving the bag empty
    pub fn take(&mut self) -> MetricsBag {
        std::mem::take(self)
    }

    /// Snapshot for one reporting interval
    ///
    /// Counters, deltas and gauges are copied and keep accumulating.
    /// Histogram and timing samples move into the snapshot, so the next
    /// interval starts without them.
    pub fn snapshot(&mut self) -> MetricsBag {
        let mut snapshot = MetricsBag::new();
        self.samples.retain(|name, sample| {
            let drained = match sample {
                MetricSample::Histogram(values) => MetricSample::Histogram(std::mem::take(values)),
                MetricSample::Timing(values) => MetricSample::Timing(std::mem::take(values)),
                other => {
                    snapshot.samples.insert(name.clone(), other.clone());
                    return true;
                }
            };
            snapshot.samples.insert(name.clone(), drained);
            false
        });
        snapshot
    }
}

/// Per-interval stats snapshot of one component
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    /// Records (or batches, for sources) handled
    pub processed: u64,
    /// Records intentionally discarded
    pub filtered: u64,
    /// Errors encountered
    pub errors: u64,
    /// Named typed samples
    pub bag: MetricsBag,
}

impl Stats {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snapshot from the three fixed counts
    pub fn with_counts(processed: u64, filtered: u64, errors: u64) -> Self {
        Self {
            processed,
            filtered,
            errors,
            bag: MetricsBag::new(),
        }
    }

    /// Attach a bag (builder style)
    pub fn with_bag(mut self, bag: MetricsBag) -> Self {
        self.bag = bag;
        self
    }

    /// Merge another snapshot into this one
    pub fn merge(&mut self, other: &Stats) {
        self.processed = self.processed.saturating_add(other.processed);
        self.filtered = self.filtered.saturating_add(other.filtered);
        self.errors = self.errors.saturating_add(other.errors);
        self.bag.merge(&other.bag);
    }

    /// Merge a sequence of snapshots into one
    pub fn merged<'a>(stats: impl IntoIterator<Item = &'a Stats>) -> Stats {
        let mut total = Stats::new();
        for s in stats {
            total.merge(s);
        }
        total
    }
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
