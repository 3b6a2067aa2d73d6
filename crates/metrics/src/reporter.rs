//! Periodic stats reporter
//!
//! Collects a [`CollectedStats`] from a [`StatsCollector`] at the configured
//! interval and logs the formatted report through `tracing`.
//!
//! The reporter runs on its own thread. It ticks with
//! `crossbeam::channel::tick` and stops when its [`ReporterHandle`] is shut
//! down or dropped.

use crate::{
    CollectedStats, HumanFormatter, JsonFormatter, StatsCollector, format::StatsFormatter,
};
use crossbeam::channel::{self, Sender};
use crossbeam::select;
use sluice_config::{MetricsConfig, MetricsFormat};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// Builder for constructing a StatsReporter
#[derive(Default)]
pub struct StatsReporterBuilder {
    config: Option<MetricsConfig>,
    collector: Option<Arc<dyn StatsCollector>>,
    formatter: Option<Box<dyn StatsFormatter>>,
}

impl StatsReporterBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the metrics configuration
    pub fn config(mut self, config: MetricsConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the stats collector
    pub fn collector(mut self, collector: Arc<dyn StatsCollector>) -> Self {
        self.collector = Some(collector);
        self
    }

    /// Override the formatter selected by `config.format`
    pub fn formatter(mut self, formatter: Box<dyn StatsFormatter>) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Build the StatsReporter
    ///
    /// Returns `None` when no collector was registered.
    pub fn build(self) -> Option<StatsReporter> {
        let config = self.config.unwrap_or_default();
        let formatter = self.formatter.unwrap_or_else(|| match config.format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        });

        Some(StatsReporter {
            config,
            formatter,
            collector: self.collector?,
            previous: None,
        })
    }
}

/// Periodic stats reporter
pub struct StatsReporter {
    config: MetricsConfig,
    formatter: Box<dyn StatsFormatter>,
    collector: Arc<dyn StatsCollector>,
    previous: Option<CollectedStats>,
}

impl StatsReporter {
    /// Create a new builder
    pub fn builder() -> StatsReporterBuilder {
        StatsReporterBuilder::new()
    }

    /// Collect and format one report without logging it
    pub fn render(&mut self) -> String {
        let stats = self.collector.collect();
        let rates = self.previous.as_ref().and_then(|prev| stats.rates(prev));
        let output = self
            .formatter
            .format(&stats, rates.as_ref(), self.config.include_invalid_fields);
        self.previous = Some(stats);
        output
    }

    /// Collect and log one report
    pub fn report(&mut self) {
        let output = self.render();
        // Log each line separately for human format (multiple lines)
        for line in output.lines() {
            info!("{}", line);
        }
    }

    /// Spawn the reporter thread
    ///
    /// When reporting is disabled the returned handle owns no thread.
    pub fn spawn(mut self) -> ReporterHandle {
        if !self.config.enabled {
            info!("stats reporting disabled");
            return ReporterHandle {
                shutdown: None,
                thread: None,
            };
        }

        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(0);
        let interval = self.config.interval;

        let spawned = thread::Builder::new()
            .name("sluice-stats".into())
            .spawn(move || {
                let ticker = channel::tick(interval);
                info!(
                    interval_ms = interval.as_millis() as u64,
                    format = ?self.config.format,
                    "stats reporter started"
                );

                loop {
                    select! {
                        recv(ticker) -> _ => self.report(),
                        recv(shutdown_rx) -> _ => break,
                    }
                }

                if self.config.report_on_exit {
                    self.report();
                }
                info!("stats reporter stopped");
            });

        match spawned {
            Ok(thread) => ReporterHandle {
                shutdown: Some(shutdown_tx),
                thread: Some(thread),
            },
            Err(e) => {
                warn!(error = %e, "failed to spawn stats reporter thread");
                ReporterHandle {
                    shutdown: None,
                    thread: None,
                }
            }
        }
    }
}

/// Handle to a running reporter thread
///
/// Dropping the handle stops the reporter without waiting for it.
pub struct ReporterHandle {
    shutdown: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ReporterHandle {
    /// Whether a reporter thread is running
    pub fn is_running(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop the reporter and wait for its final report
    pub fn shutdown(mut self) {
        // Disconnecting the channel wakes the select
        self.shutdown.take();
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            warn!("stats reporter thread panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ComponentRole, PipelineSnapshot, Stats};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    struct TestCollector {
        calls: AtomicU64,
    }

    impl StatsCollector for TestCollector {
        fn collect(&self) -> CollectedStats {
            let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
            let mut stats = CollectedStats::new();
            stats.pipeline = Some(PipelineSnapshot {
                records: n * 100,
                ..Default::default()
            });
            stats.add_component(ComponentRole::Source, "memory", &Stats::with_counts(n, 0, 0));
            stats
        }
    }

    fn collector() -> Arc<TestCollector> {
        Arc::new(TestCollector {
            calls: AtomicU64::new(0),
        })
    }

    #[test]
    fn test_build_requires_collector() {
        assert!(StatsReporter::builder().build().is_none());
    }

    #[test]
    fn test_render_uses_config_format() {
        let config = MetricsConfig {
            format: MetricsFormat::Json,
            ..Default::default()
        };
        let mut reporter = StatsReporter::builder()
            .config(config)
            .collector(collector())
            .build()
            .unwrap();

        let output = reporter.render();
        assert!(output.starts_with(r#"{"type":"stats""#));
        // No baseline yet
        assert!(!output.contains("rates"));

        std::thread::sleep(Duration::from_millis(5));
        let output = reporter.render();
        assert!(output.contains("rates"));
    }

    #[test]
    fn test_spawn_disabled() {
        let config = MetricsConfig {
            enabled: false,
            ..Default::default()
        };
        let handle = StatsReporter::builder()
            .config(config)
            .collector(collector())
            .build()
            .unwrap()
            .spawn();

        assert!(!handle.is_running());
        handle.shutdown();
    }

    #[test]
    fn test_spawn_ticks_and_shuts_down() {
        let collector = collector();
        let config = MetricsConfig {
            interval: Duration::from_millis(10),
            report_on_exit: true,
            ..Default::default()
        };
        let handle = StatsReporter::builder()
            .config(config)
            .collector(collector.clone())
            .build()
            .unwrap()
            .spawn();

        assert!(handle.is_running());
        std::thread::sleep(Duration::from_millis(60));
        handle.shutdown();

        // At least one tick plus the final report
        assert!(collector.calls.load(Ordering::Relaxed) >= 2);
    }
}
