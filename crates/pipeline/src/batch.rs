//! Data exchanged between stages
//!
//! - [`DataBatch`]: newline-delimited bytes from a Source to the filter workers
//! - [`OutputRecord`]: projection of one record, from a filter worker to a sink
//! - [`UploadRequest`]: a finished artifact, from a sink to the uploader

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use sluice_config::SinkOutput;
use sluice_record::{FieldIndex, Metadata, Record};

#[cfg(test)]
#[path = "batch_test.rs"]
mod tests;

/// Newline-delimited serialized records produced by a Source
///
/// Handed back to the Source with `Source::release_batch` once every line
/// was processed, so the buffer can be reused.
#[derive(Debug, Clone)]
pub struct DataBatch {
    /// Raw lines, `\n` terminated (the last terminator is optional)
    pub data: Bytes,

    /// Shared by every record parsed from this batch
    pub metadata: Option<Arc<Metadata>>,
}

impl DataBatch {
    /// Create a batch without metadata
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            metadata: None,
        }
    }

    /// Attach metadata (builder style)
    pub fn with_metadata(mut self, metadata: Arc<Metadata>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Size of the batch in bytes
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the batch holds no bytes
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Iterate over the lines of this batch without copying
    ///
    /// A trailing `\r` is stripped from each line. The empty piece after a
    /// final `\n` is not a line; empty lines in between are.
    pub fn lines(&self) -> Lines<'_> {
        Lines {
            data: &self.data,
            pos: 0,
        }
    }
}

/// Zero-copy line iterator over a batch
pub struct Lines<'a> {
    data: &'a Bytes,
    pos: usize,
}

impl Iterator for Lines<'_> {
    type Item = Bytes;

    fn next(&mut self) -> Option<Bytes> {
        let data = self.data;
        let rest = data.get(self.pos..)?;
        if rest.is_empty() {
            return None;
        }

        let (mut line, consumed) = match rest.iter().position(|&b| b == b'\n') {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.pos += consumed;

        if let [head @ .., b'\r'] = line {
            line = head;
        }
        Some(data.slice_ref(line))
    }
}

/// Which parts of a record a sink consumes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    /// Configured output fields only
    Fields,
    /// The full re-serialized record only
    #[default]
    Raw,
    /// Both
    Both,
}

impl OutputMode {
    /// Whether output fields are projected
    #[inline]
    pub fn needs_fields(self) -> bool {
        matches!(self, Self::Fields | Self::Both)
    }

    /// Whether the serialized record is projected
    #[inline]
    pub fn needs_raw(self) -> bool {
        matches!(self, Self::Raw | Self::Both)
    }

    /// Smallest mode covering both `self` and `other`
    pub fn union(self, other: OutputMode) -> OutputMode {
        match (self.needs_fields() || other.needs_fields(), self.needs_raw() || other.needs_raw()) {
            (true, true) => Self::Both,
            (true, false) => Self::Fields,
            _ => Self::Raw,
        }
    }
}

impl From<SinkOutput> for OutputMode {
    fn from(output: SinkOutput) -> Self {
        match output {
            SinkOutput::Fields => Self::Fields,
            SinkOutput::Raw => Self::Raw,
            SinkOutput::Both => Self::Both,
        }
    }
}

/// Terminal projection of one record
///
/// Every value shares memory with the record's line or overlay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputRecord {
    /// Values of the configured output fields, in configured order
    pub fields: Vec<Bytes>,

    /// Full serialized record
    pub raw: Option<Bytes>,
}

impl OutputRecord {
    /// Value of the n-th output field
    #[inline]
    pub fn field(&self, n: usize) -> Option<&Bytes> {
        self.fields.get(n)
    }
}

/// Builds [`OutputRecord`]s at the end of the filter chain
#[derive(Debug, Clone)]
pub struct Projection {
    fields: Vec<FieldIndex>,
    mode: OutputMode,
}

impl Projection {
    /// Create a projection of `fields` in `mode`
    pub fn new(fields: Vec<FieldIndex>, mode: OutputMode) -> Self {
        Self { fields, mode }
    }

    /// Projection mode
    #[inline]
    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    /// Projected field indices
    #[inline]
    pub fn fields(&self) -> &[FieldIndex] {
        &self.fields
    }

    /// Project one record
    pub fn project(&self, record: &Record) -> OutputRecord {
        let fields = if self.mode.needs_fields() {
            self.fields.iter().map(|&i| record.get_bytes(i)).collect()
        } else {
            Vec::new()
        };
        let raw = self.mode.needs_raw().then(|| record.to_bytes());

        OutputRecord { fields, raw }
    }
}

/// A finished artifact ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadRequest {
    /// Local path of the artifact
    pub path: PathBuf,

    /// Records written to it
    pub records: u64,
}

impl UploadRequest {
    /// Create a new upload request
    pub fn new(path: impl Into<PathBuf>, records: u64) -> Self {
        Self {
            path: path.into(),
            records,
        }
    }
}
