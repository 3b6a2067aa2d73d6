//! Reader source - newline-delimited input from stdin, a file or any reader
//!
//! Reads into pooled buffers of up to `batch_bytes`, cuts each buffer at
//! its last newline and carries the partial line over to the next batch.
//! A line longer than `batch_bytes` grows the buffer until it is complete.
//!
//! Files attach `source.path` and `source.mtime` (seconds since the Unix
//! epoch) to every batch.
//!
//! `stop()` is honoured between reads. A read blocked on an idle stdin only
//! returns when input arrives or the stream closes.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;

use crossbeam::channel::Sender;
use parking_lot::Mutex;
use sluice_config::SourceConfig;
use sluice_metrics::Stats;
use sluice_pipeline::{ComponentError, DataBatch, Source};
use sluice_record::Metadata;
use tokio_util::sync::CancellationToken;

use crate::buffer_pool::BufferPool;
use crate::metrics::SourceMetrics;

#[cfg(test)]
#[path = "reader_test.rs"]
mod tests;

/// Smallest read issued while growing a buffer for a long line
const MIN_READ: usize = 8 * 1024;

/// Where a reader source reads from
pub enum ReaderInput {
    /// Standard input
    Stdin,
    /// A file, opened when the source starts
    File(PathBuf),
    /// An already open reader, consumed by the first run
    Reader(Mutex<Option<Box<dyn Read + Send>>>),
}

impl std::fmt::Debug for ReaderInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => f.write_str("Stdin"),
            Self::File(path) => f.debug_tuple("File").field(path).finish(),
            Self::Reader(_) => f.write_str("Reader"),
        }
    }
}

/// Source reading newline-delimited records from a byte stream
#[derive(Debug)]
pub struct ReaderSource {
    input: ReaderInput,
    batch_bytes: usize,
    pool: BufferPool,
    metrics: SourceMetrics,
    cancel: CancellationToken,
}

impl ReaderSource {
    /// Source over `input` with batches of about `batch_bytes`
    pub fn new(input: ReaderInput, batch_bytes: usize, buffer_pool: usize) -> Self {
        let batch_bytes = batch_bytes.max(1);
        Self {
            input,
            batch_bytes,
            pool: BufferPool::new(buffer_pool, batch_bytes),
            metrics: SourceMetrics::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Source reading standard input
    pub fn stdin(batch_bytes: usize, buffer_pool: usize) -> Self {
        Self::new(ReaderInput::Stdin, batch_bytes, buffer_pool)
    }

    /// Source reading a file
    pub fn file(path: impl Into<PathBuf>, batch_bytes: usize, buffer_pool: usize) -> Self {
        Self::new(ReaderInput::File(path.into()), batch_bytes, buffer_pool)
    }

    /// Source reading an arbitrary reader
    pub fn reader(reader: impl Read + Send + 'static, batch_bytes: usize, buffer_pool: usize) -> Self {
        let reader: Box<dyn Read + Send> = Box::new(reader);
        Self::new(
            ReaderInput::Reader(Mutex::new(Some(reader))),
            batch_bytes,
            buffer_pool,
        )
    }

    /// Source described by a `[source]` section
    pub fn from_config(config: &SourceConfig) -> Self {
        match config {
            SourceConfig::Stdin(c) => Self::stdin(c.batch_bytes, c.buffer_pool),
            SourceConfig::File(c) => Self::file(&c.path, c.batch_bytes, c.buffer_pool),
        }
    }

    /// Input of this source
    pub fn input(&self) -> &ReaderInput {
        &self.input
    }

    /// Batch buffer pool
    pub fn buffer_pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Source counters
    pub fn metrics(&self) -> &SourceMetrics {
        &self.metrics
    }

    /// Read `reader` to the end, sending one batch per filled buffer
    fn read_from<R: Read>(
        &self,
        mut reader: R,
        metadata: Option<Arc<Metadata>>,
        output: &Sender<DataBatch>,
        context: &str,
    ) -> Result<(), ComponentError> {
        let mut carry: Vec<u8> = Vec::new();

        loop {
            if self.cancel.is_cancelled() {
                tracing::debug!(source = self.name(), "reader source stopped");
                return Ok(());
            }

            let mut buf = self.pool.get();
            buf.extend_from_slice(&carry);
            carry.clear();

            let mut eof = false;
            let mut has_newline = false;
            let mut failure = None;

            // A read that completes a line ends the batch, so a slow pipe
            // does not wait for a full buffer
            while !has_newline {
                let start = buf.len();
                let want = match self.batch_bytes.saturating_sub(start) {
                    0 => self.batch_bytes.min(MIN_READ),
                    room => room,
                };
                buf.resize(start + want, 0);

                self.metrics.read();
                match reader.read(&mut buf[start..]) {
                    Ok(0) => {
                        buf.truncate(start);
                        eof = true;
                        break;
                    }
                    Ok(n) => {
                        has_newline |= buf[start..start + n].contains(&b'\n');
                        buf.truncate(start + n);
                    }
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => buf.truncate(start),
                    Err(e) => {
                        buf.truncate(start);
                        self.metrics.error();
                        failure = Some(e);
                        break;
                    }
                }
            }

            if !eof
                && failure.is_none()
                && let Some(pos) = buf.iter().rposition(|&b| b == b'\n')
            {
                carry.extend_from_slice(&buf[pos + 1..]);
                buf.truncate(pos + 1);
            }

            if buf.is_empty() {
                self.pool.put(buf);
            } else {
                let len = buf.len();
                let mut batch = DataBatch::new(buf.freeze());
                batch.metadata = metadata.clone();
                if output.send(batch).is_err() {
                    tracing::debug!(source = self.name(), "batch queue closed");
                    return Ok(());
                }
                self.metrics.batch_sent(len);
            }

            if let Some(e) = failure {
                return Err(ComponentError::io(format!("reading {context}"), e));
            }
            if eof {
                return Ok(());
            }
        }
    }
}

impl Source for ReaderSource {
    fn run(&self, output: Sender<DataBatch>) -> Result<(), ComponentError> {
        match &self.input {
            ReaderInput::Stdin => {
                tracing::info!(batch_bytes = self.batch_bytes, "reading stdin");
                self.read_from(io::stdin().lock(), None, &output, "stdin")
            }
            ReaderInput::File(path) => {
                let context = path.display().to_string();
                let file = File::open(path)
                    .map_err(|e| ComponentError::io(format!("opening {context}"), e))?;
                let metadata = file_metadata(path, &file);
                tracing::info!(path = %context, batch_bytes = self.batch_bytes, "reading file");
                self.read_from(file, Some(metadata), &output, &context)
            }
            ReaderInput::Reader(reader) => {
                let Some(reader) = reader.lock().take() else {
                    return Err(ComponentError::failed("reader source already consumed"));
                };
                self.read_from(reader, None, &output, "reader")
            }
        }
    }

    fn stop(&self) {
        self.cancel.cancel();
    }

    fn stats(&self) -> Stats {
        let mut stats = self.metrics.stats();
        stats
            .bag
            .gauge("buffer_hit_rate", self.pool.metrics().hit_rate());
        stats
    }

    fn release_batch(&self, batch: DataBatch) {
        self.pool.reclaim(batch.data);
    }

    fn name(&self) -> &'static str {
        match self.input {
            ReaderInput::Stdin => "stdin",
            ReaderInput::File(_) => "file",
            ReaderInput::Reader(_) => "reader",
        }
    }
}

/// `source.path` and `source.mtime` of an open file
fn file_metadata(path: &Path, file: &File) -> Arc<Metadata> {
    let mut metadata = Metadata::new().with(Metadata::SOURCE_PATH, path.display().to_string());
    if let Ok(modified) = file.metadata().and_then(|m| m.modified())
        && let Ok(age) = modified.duration_since(UNIX_EPOCH)
    {
        metadata.insert(Metadata::SOURCE_MTIME, age.as_secs().to_string());
    }
    Arc::new(metadata)
}
