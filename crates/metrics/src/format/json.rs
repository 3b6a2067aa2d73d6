//! JSON stats formatter
//!
//! Formats stats as one structured JSON object per report.
//!
//! # Example Output
//!
//! ```json
//! {
//!   "type": "stats",
//!   "pipeline": { "records": 1500, "malformed": 2, ... },
//!   "rates": { "records_per_sec": 1500, "bytes_per_sec": 2048 },
//!   "invalid_fields": { "host": 2 },
//!   "components": [
//!     { "role": "sink", "type": "file", "instances": 2, "processed": 1495,
//!       "metrics": { "rows": { "kind": "counter", "value": 1495 } } }
//!   ]
//! }
//! ```

use super::StatsFormatter;
use crate::{
    CollectedStats, ComponentRole, MetricKind, MetricSample, PipelineSnapshot, SampleSummary,
    StatsRates,
};
use serde::Serialize;
use std::collections::BTreeMap;

/// JSON stats formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    /// Create a new JSON formatter
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pipeline: Option<&'a PipelineSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rates: Option<RatesJson>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    invalid_fields: BTreeMap<&'a str, u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    components: Vec<ComponentJson<'a>>,
}

#[derive(Serialize)]
struct RatesJson {
    records_per_sec: u64,
    bytes_per_sec: u64,
    emitted_per_sec: u64,
}

#[derive(Serialize)]
struct ComponentJson<'a> {
    role: ComponentRole,
    #[serde(rename = "type")]
    component_type: &'a str,
    instances: usize,
    processed: u64,
    filtered: u64,
    errors: u64,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    metrics: BTreeMap<&'a str, SampleJson>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum SampleJson {
    Scalar { kind: MetricKind, value: f64 },
    Summary {
        kind: MetricKind,
        #[serde(flatten)]
        summary: SampleSummary,
    },
}

impl SampleJson {
    fn from_sample(sample: &MetricSample) -> Self {
        let kind = sample.kind();
        match sample {
            MetricSample::Counter(v) => Self::Scalar {
                kind,
                value: *v as f64,
            },
            MetricSample::Delta(v) => Self::Scalar {
                kind,
                value: *v as f64,
            },
            MetricSample::Gauge(v) => Self::Scalar { kind, value: *v },
            MetricSample::Histogram(_) | MetricSample::Timing(_) => Self::Summary {
                kind,
                summary: sample.summary(),
            },
        }
    }
}

impl StatsFormatter for JsonFormatter {
    fn format(
        &self,
        stats: &CollectedStats,
        rates: Option<&StatsRates>,
        include_invalid_fields: bool,
    ) -> String {
        let json = ReportJson {
            report_type: "stats",
            pipeline: stats.pipeline.as_ref(),
            rates: rates.map(|r| RatesJson {
                records_per_sec: r.records_per_sec as u64,
                bytes_per_sec: r.bytes_per_sec as u64,
                emitted_per_sec: r.emitted_per_sec as u64,
            }),
            invalid_fields: if include_invalid_fields {
                stats
                    .invalid_fields
                    .iter()
                    .map(|(name, count)| (name.as_str(), *count))
                    .collect()
            } else {
                BTreeMap::new()
            },
            components: stats
                .components
                .iter()
                .map(|c| ComponentJson {
                    role: c.role,
                    component_type: &c.component_type,
                    instances: c.instances,
                    processed: c.stats.processed,
                    filtered: c.stats.filtered,
                    errors: c.stats.errors,
                    metrics: c
                        .stats
                        .bag
                        .iter()
                        .map(|(name, sample)| (name, SampleJson::from_sample(sample)))
                        .collect(),
                })
                .collect(),
        };

        serde_json::to_string(&json).unwrap_or_else(|e| {
            format!(r#"{{"type":"stats","error":"serialization failed: {e}"}}"#)
        })
    }
}
