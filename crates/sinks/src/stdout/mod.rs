//! Stdout sink - one line per record on standard output
//!
//! Several instances may share stdout. Each one renders a burst of records
//! into a private buffer and writes it under the stdout lock, so lines never
//! interleave mid-record. Sharding across stdout instances is refused.

use std::io::{self, Write};
use std::sync::Arc;

use crossbeam::channel::{Receiver, Sender};
use parking_lot::Mutex;
use sluice_config::StdoutSinkConfig;
use sluice_metrics::{Counter, Stats};
use sluice_pipeline::{OutputMode, OutputRecord, Sink, UploadRequest};

use crate::util::{DEFAULT_LOG_INTERVAL, LineFormat, RateLimitedLogger};


/// Bytes rendered before a write is forced
const FLUSH_BYTES: usize = 64 * 1024;

/// Where rendered lines go
#[derive(Debug, Clone)]
enum Target {
    Stdout,
    Buffer(Arc<Mutex<Vec<u8>>>),
}

/// Stdout sink
#[derive(Debug)]
pub struct StdoutSink {
    format: LineFormat,
    target: Target,
    metrics: StdoutSinkMetrics,
    errors: RateLimitedLogger,
}

/// Metrics for stdout sink
#[derive(Debug, Default)]
pub struct StdoutSinkMetrics {
    pub records_written: Counter,
    pub bytes_written: Counter,
    pub flushes: Counter,
    pub write_errors: Counter,
}

impl StdoutSink {
    /// Sink writing `format` lines to stdout
    pub fn new(format: LineFormat) -> Self {
        Self::with_target(format, Target::Stdout)
    }

    /// Sink described by a `[sink]` section
    pub fn from_config(config: &StdoutSinkConfig) -> Self {
        Self::new(LineFormat::new(
            config.output.into(),
            config.field_delimiter.as_bytes(),
        ))
    }

    /// Sink appending its lines to `buffer` instead of stdout
    pub fn with_buffer(format: LineFormat, buffer: Arc<Mutex<Vec<u8>>>) -> Self {
        Self::with_target(format, Target::Buffer(buffer))
    }

    fn with_target(format: LineFormat, target: Target) -> Self {
        Self {
            format,
            target,
            metrics: StdoutSinkMetrics::default(),
            errors: RateLimitedLogger::new("stdout", DEFAULT_LOG_INTERVAL),
        }
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &StdoutSinkMetrics {
        &self.metrics
    }

    /// Write out and clear `buf`
    fn flush(&self, buf: &mut Vec<u8>) {
        if buf.is_empty() {
            return;
        }

        let result = match &self.target {
            Target::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(buf).and_then(|()| out.flush())
            }
            Target::Buffer(shared) => {
                shared.lock().extend_from_slice(buf);
                Ok(())
            }
        };

        match result {
            Ok(()) => {
                self.metrics.flushes.inc();
                self.metrics.bytes_written.add(buf.len() as u64);
            }
            Err(e) => {
                self.metrics.write_errors.inc();
                self.errors.error("stdout write failed", &e);
            }
        }
        buf.clear();
    }
}

impl Sink for StdoutSink {
    fn run(&self, input: Receiver<OutputRecord>, _uploads: Sender<UploadRequest>) {
        let mut buf = Vec::with_capacity(FLUSH_BYTES);

        for record in input.iter() {
            // Writing into a Vec cannot fail
            let _ = self.format.write(&mut buf, &record);
            self.metrics.records_written.inc();

            if buf.len() >= FLUSH_BYTES || input.is_empty() {
                self.flush(&mut buf);
            }
        }
        self.flush(&mut buf);

        tracing::debug!(
            records = self.metrics.records_written.get(),
            "stdout sink shutting down"
        );
    }

    fn stats(&self) -> Stats {
        let mut stats = Stats::with_counts(
            self.metrics.records_written.get(),
            0,
            self.metrics.write_errors.get(),
        );
        stats.bag.counter("bytes", self.metrics.bytes_written.get());
        stats.bag.counter("flushes", self.metrics.flushes.get());
        stats
    }

    fn supports_sharding(&self) -> bool {
        false
    }

    fn output_mode(&self) -> OutputMode {
        self.format.mode()
    }

    fn name(&self) -> &'static str {
        "stdout"
    }
}
