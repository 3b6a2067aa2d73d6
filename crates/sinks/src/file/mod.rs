//! File sink - rotating line files handed to the uploader
//!
//! Each instance writes `<prefix>-<instance>-<sequence>.log` files in the
//! configured directory. A file is written as `<name>.part` and renamed when
//! it is finished, either after `max_records` records or when the input
//! queue closes. Every finished file is announced on the upload queue.
//!
//! # Directory Structure
//!
//! ```text
//! out/
//! ├── sluice-0-000000.log        # finished, sent to the uploader
//! ├── sluice-0-000001.log.part   # being written by instance 0
//! └── sluice-1-000000.log.part   # being written by instance 1
//! ```
//!
//! Existing files are never overwritten; the sequence skips names already
//! present in the directory.
//!
//! I/O errors are counted and logged at a limited rate. Records that cannot
//! be written are dropped so the topology keeps draining.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use crossbeam::channel::{Receiver, Sender};
use sluice_config::FileSinkConfig;
use sluice_metrics::{Counter, Stats};
use sluice_pipeline::{ComponentParams, OutputMode, OutputRecord, Sink, UploadRequest};
use thiserror::Error;

use crate::util::{DEFAULT_LOG_INTERVAL, LineFormat, RateLimitedLogger};


/// Suffix of a file still being written
const PART_SUFFIX: &str = "part";

/// File sink errors
#[derive(Debug, Error)]
pub enum FileSinkError {
    /// Failed to create the output directory
    #[error("failed to create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to open a new file
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to write a record
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to flush or rename a finished file
    #[error("failed to finish {path}: {source}")]
    Finish {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Metrics for the file sink
#[derive(Debug, Default)]
pub struct FileSinkMetrics {
    /// Records written
    pub records_written: Counter,

    /// Bytes written
    pub bytes_written: Counter,

    /// Files finished and announced
    pub files_finished: Counter,

    /// Records dropped because no file could be opened
    pub records_dropped: Counter,

    /// I/O errors
    pub errors: Counter,
}

/// File being written
struct OpenFile {
    part: PathBuf,
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

/// Rotating file sink
#[derive(Debug)]
pub struct FileSink {
    config: FileSinkConfig,
    instance: usize,
    format: LineFormat,
    params: ComponentParams,
    metrics: FileSinkMetrics,
    errors: RateLimitedLogger,
}

impl FileSink {
    /// Instance `instance` of a file sink
    pub fn new(config: FileSinkConfig, instance: usize, params: ComponentParams) -> Self {
        let format = LineFormat::new(config.output.into(), config.field_delimiter.as_bytes());
        Self {
            config,
            instance,
            format,
            params,
            metrics: FileSinkMetrics::default(),
            errors: RateLimitedLogger::new("file", DEFAULT_LOG_INTERVAL),
        }
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &FileSinkMetrics {
        &self.metrics
    }

    /// Output directory
    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    fn fail(&self, message: &str, error: FileSinkError) {
        self.metrics.errors.inc();
        self.errors.error(message, &error);
    }

    /// Open the next free `<prefix>-<instance>-<seq>.log`
    ///
    /// The part file is created exclusively, so a name taken by another
    /// writer in the meantime is skipped rather than truncated.
    fn open_next(&self, seq: &mut u64) -> Option<OpenFile> {
        loop {
            let name = format!("{}-{}-{:06}.log", self.config.prefix, self.instance, *seq);
            let path = self.config.dir.join(&name);
            let part = self.config.dir.join(format!("{name}.{PART_SUFFIX}"));
            *seq += 1;
            if path.exists() {
                continue;
            }

            match OpenOptions::new().write(true).create_new(true).open(&part) {
                Ok(file) => {
                    tracing::debug!(path = %part.display(), "file sink opened file");
                    return Some(OpenFile {
                        writer: BufWriter::with_capacity(self.config.buffer_size.max(1), file),
                        part,
                        path,
                        records: 0,
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(source) => {
                    self.fail("file sink open failed", FileSinkError::Open { path: part, source });
                    return None;
                }
            }
        }
    }

    /// Flush, rename and announce a file
    fn finish(&self, file: OpenFile, uploads: &Sender<UploadRequest>) {
        let OpenFile {
            part,
            path,
            writer,
            records,
        } = file;

        let flushed = writer
            .into_inner()
            .map_err(|e| e.into_error())
            .and_then(|file| file.sync_all());
        if let Err(source) = flushed {
            self.fail("file sink flush failed", FileSinkError::Finish { path: part, source });
            return;
        }

        if records == 0 {
            // Nothing made it in; leave no empty artifact behind
            let _ = fs::remove_file(&part);
            return;
        }

        if let Err(source) = fs::rename(&part, &path) {
            self.fail("file sink rename failed", FileSinkError::Finish { path: part, source });
            return;
        }

        self.metrics.files_finished.inc();
        {
            let mut bag = self.params.metrics.lock();
            bag.counter("files", 1);
            bag.histogram("file_records", records as f64);
        }
        tracing::debug!(path = %path.display(), records, "file sink finished file");

        if uploads.send(UploadRequest::new(&path, records)).is_err() {
            tracing::warn!(path = %path.display(), "upload queue closed, file left in place");
        }
    }
}

impl Sink for FileSink {
    fn run(&self, input: Receiver<OutputRecord>, uploads: Sender<UploadRequest>) {
        if let Err(source) = fs::create_dir_all(&self.config.dir) {
            let path = self.config.dir.clone();
            self.fail("file sink cannot create directory", FileSinkError::CreateDir { path, source });
        }

        let max_records = self.config.max_records;
        let mut seq = 0;
        let mut current: Option<OpenFile> = None;

        for record in input.iter() {
            if current.is_none() {
                current = self.open_next(&mut seq);
            }
            let Some(file) = current.as_mut() else {
                self.metrics.records_dropped.inc();
                continue;
            };

            match self.format.write(&mut file.writer, &record) {
                Ok(n) => {
                    file.records += 1;
                    self.metrics.records_written.inc();
                    self.metrics.bytes_written.add(n as u64);
                }
                Err(source) => {
                    let path = file.part.clone();
                    self.fail("file sink write failed", FileSinkError::Write { path, source });
                }
            }

            if max_records > 0
                && file.records >= max_records
                && let Some(file) = current.take()
            {
                self.finish(file, &uploads);
            }
        }

        if let Some(file) = current.take() {
            self.finish(file, &uploads);
        }

        tracing::debug!(
            instance = self.instance,
            records = self.metrics.records_written.get(),
            files = self.metrics.files_finished.get(),
            "file sink shutting down"
        );
    }

    fn stats(&self) -> Stats {
        let mut stats = self.params.stats_with_bag(
            self.metrics.records_written.get(),
            0,
            self.metrics.errors.get(),
        );
        stats.bag.counter("bytes", self.metrics.bytes_written.get());
        stats.bag.counter("dropped", self.metrics.records_dropped.get());
        stats
    }

    fn output_mode(&self) -> OutputMode {
        self.format.mode()
    }

    fn name(&self) -> &'static str {
        "file"
    }
}
