//! Move uploader - ships finished files into a destination directory
//!
//! Stands in for an object-store uploader: each finished file is renamed
//! into `destination`, falling back to copy and delete across filesystems.
//! A name already taken in the destination gets a numeric suffix
//! (`sluice-0-000000.1.log`) rather than replacing the older file.
//!
//! `stop()` ends the run after the file being moved. Requests still queued
//! are left in place in the sink directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crossbeam::channel::{Receiver, RecvTimeoutError};
use sluice_config::MoveUploaderConfig;
use sluice_metrics::{Counter, Stats};
use sluice_pipeline::{ComponentError, UploadRequest, Uploader};
use tokio_util::sync::CancellationToken;

use crate::util::{DEFAULT_LOG_INTERVAL, RateLimitedLogger};

#[cfg(test)]
#[path = "move_test.rs"]
mod move_test;

/// How often a blocked run checks for `stop`
const STOP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Metrics for the move uploader
#[derive(Debug, Default)]
pub struct MoveUploaderMetrics {
    /// Files moved
    pub files_moved: Counter,

    /// Records in the moved files
    pub records_moved: Counter,

    /// Files that could not be moved
    pub errors: Counter,
}

/// Uploader moving files into a local directory
#[derive(Debug)]
pub struct MoveUploader {
    destination: PathBuf,
    cancel: CancellationToken,
    metrics: MoveUploaderMetrics,
    errors: RateLimitedLogger,
}

impl MoveUploader {
    /// Uploader moving files into `destination`
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            cancel: CancellationToken::new(),
            metrics: MoveUploaderMetrics::default(),
            errors: RateLimitedLogger::new("move", DEFAULT_LOG_INTERVAL),
        }
    }

    /// Uploader described by an `[uploader]` section
    pub fn from_config(config: &MoveUploaderConfig) -> Self {
        Self::new(&config.destination)
    }

    /// Destination directory
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Get reference to metrics
    #[inline]
    pub fn metrics(&self) -> &MoveUploaderMetrics {
        &self.metrics
    }

    fn upload(&self, request: UploadRequest) {
        let Some(name) = request.path.file_name() else {
            self.metrics.errors.inc();
            tracing::warn!(path = %request.path.display(), "upload request without a file name");
            return;
        };
        let target = unique_target(&self.destination, Path::new(name));

        match move_file(&request.path, &target) {
            Ok(()) => {
                self.metrics.files_moved.inc();
                self.metrics.records_moved.add(request.records);
                tracing::debug!(
                    from = %request.path.display(),
                    to = %target.display(),
                    records = request.records,
                    "file uploaded"
                );
            }
            Err(e) => {
                self.metrics.errors.inc();
                self.errors.error("move upload failed", &e);
            }
        }
    }
}

/// Rename, or copy then delete when a rename is not possible
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    if fs::rename(from, to).is_ok() {
        return Ok(());
    }
    fs::copy(from, to)?;
    fs::remove_file(from)
}

/// First free name for `name` in `dir`
fn unique_target(dir: &Path, name: &Path) -> PathBuf {
    let target = dir.join(name);
    if !target.exists() {
        return target;
    }

    let stem = name.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let ext = name.extension().map(|e| e.to_string_lossy());
    (1..)
        .map(|n| match &ext {
            Some(ext) => dir.join(format!("{stem}.{n}.{ext}")),
            None => dir.join(format!("{stem}.{n}")),
        })
        .find(|candidate| !candidate.exists())
        .unwrap_or(target)
}

impl Uploader for MoveUploader {
    fn run(&self, input: Receiver<UploadRequest>) -> Result<(), ComponentError> {
        fs::create_dir_all(&self.destination).map_err(|e| {
            ComponentError::io(format!("creating {}", self.destination.display()), e)
        })?;
        tracing::info!(destination = %self.destination.display(), "move uploader starting");

        while !self.cancel.is_cancelled() {
            match input.recv_timeout(STOP_POLL_INTERVAL) {
                Ok(request) => self.upload(request),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        tracing::info!(
            files = self.metrics.files_moved.get(),
            errors = self.metrics.errors.get(),
            "move uploader shutting down"
        );
        Ok(())
    }

    fn stop(&self) {
        self.cancel.cancel();
    }

    fn stats(&self) -> Stats {
        let mut stats =
            Stats::with_counts(self.metrics.files_moved.get(), 0, self.metrics.errors.get());
        stats.bag.counter("records", self.metrics.records_moved.get());
        stats
    }

    fn name(&self) -> &'static str {
        "move"
    }
}
