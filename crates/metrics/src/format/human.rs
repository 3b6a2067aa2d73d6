//! Human-readable stats formatter
//!
//! # Example Output
//!
//! ```text
//! [stats] pipeline: 12.0K/s | 1.1 MB/s | records: 120.0K | malformed: 0 | invalid: 3 | filter err: 0 | dropped: 41 | emitted: 119.9K
//! [stats] invalid fields: host=2 ts=1
//! [stats] source file: processed 30, filtered 0, errors 0
//! [stats] sink file x4: processed 119.9K, filtered 0, errors 0 | rows=119.9K flush=[n=12 avg=1.20 max=3.10]
//! ```

use super::{StatsFormatter, format_bytes_per_sec, format_count, format_rate};
use crate::{CollectedComponent, CollectedStats, MetricSample, PipelineSnapshot, StatsRates};
use std::fmt::Write;

/// Human-readable stats formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    /// Create a new human formatter
    pub fn new() -> Self {
        Self
    }

    fn format_pipeline(&self, pipeline: &PipelineSnapshot, rates: Option<&StatsRates>) -> String {
        let mut output = String::from("[stats] pipeline:");
        if let Some(rates) = rates {
            let _ = write!(
                output,
                " {} | {} |",
                format_rate(rates.records_per_sec),
                format_bytes_per_sec(rates.bytes_per_sec),
            );
        }
        let _ = write!(
            output,
            " records: {} | malformed: {} | invalid: {} | filter err: {} | dropped: {} | emitted: {}",
            format_count(pipeline.records),
            pipeline.malformed,
            pipeline.invalid,
            pipeline.filter_errors,
            format_count(pipeline.dropped),
            format_count(pipeline.emitted),
        );
        if pipeline.backpressure > 0 {
            let _ = write!(output, " | backpressure: {}", format_count(pipeline.backpressure));
        }
        output
    }

    fn format_invalid_fields(&self, stats: &CollectedStats) -> Option<String> {
        if stats.invalid_fields.is_empty() {
            return None;
        }
        let mut output = String::from("[stats] invalid fields:");
        for (name, count) in &stats.invalid_fields {
            let _ = write!(output, " {name}={count}");
        }
        Some(output)
    }

    fn format_component(&self, component: &CollectedComponent) -> String {
        let mut output = format!("[stats] {} {}", component.role, component.component_type);
        if component.instances > 1 {
            let _ = write!(output, " x{}", component.instances);
        }
        let stats = &component.stats;
        let _ = write!(
            output,
            ": processed {}, filtered {}, errors {}",
            format_count(stats.processed),
            format_count(stats.filtered),
            stats.errors,
        );

        for (i, (name, sample)) in stats.bag.iter().enumerate() {
            output.push_str(if i == 0 { " | " } else { " " });
            match sample {
                MetricSample::Counter(v) => {
                    let _ = write!(output, "{name}={}", format_count(*v));
                }
                MetricSample::Delta(v) => {
                    let _ = write!(output, "{name}={v:+}");
                }
                MetricSample::Gauge(v) => {
                    let _ = write!(output, "{name}={v:.2}");
                }
                MetricSample::Histogram(_) | MetricSample::Timing(_) => {
                    let summary = sample.summary();
                    let _ = write!(
                        output,
                        "{name}=[n={} avg={:.2} max={:.2}]",
                        summary.count, summary.mean, summary.max
                    );
                }
            }
        }
        output
    }
}

impl StatsFormatter for HumanFormatter {
    fn format(
        &self,
        stats: &CollectedStats,
        rates: Option<&StatsRates>,
        include_invalid_fields: bool,
    ) -> String {
        let mut lines = Vec::with_capacity(2 + stats.components.len());

        if let Some(ref pipeline) = stats.pipeline {
            lines.push(self.format_pipeline(pipeline, rates));
        }

        if include_invalid_fields && let Some(line) = self.format_invalid_fields(stats) {
            lines.push(line);
        }

        for component in &stats.components {
            lines.push(self.format_component(component));
        }

        if lines.is_empty() {
            "[stats] no activity".to_string()
        } else {
            lines.join("\n")
        }
    }
}
