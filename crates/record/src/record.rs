//! Record - zero-copy parsed line with an overlay of modified fields
//!
//! # Design
//!
//! - The backing buffer is a shared `Bytes` slice of the source batch and is
//!   never written to
//! - `ends` holds the exclusive end offset of every field, computed in a
//!   single scan at parse time
//! - `slots` maps a field index to a 1-based position in `values`; zero means
//!   "not modified", so unmodified fields never cost a slot
//! - `values` is append-only for the lifetime of one parse
//!
//! An unmodified record serializes with one copy of the original buffer.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::cache::RecordCache;
use crate::error::{RecordError, Result};
use crate::layout::Layout;
use crate::meta::Metadata;

#[cfg(test)]
#[path = "record_test.rs"]
mod tests;

/// Position of a field within a record
pub type FieldIndex = usize;

/// Maximum number of distinct fields one record may modify (8-bit slots)
pub const MAX_MODIFIED_FIELDS: usize = u8::MAX as usize;

/// Mutable view over one parsed line
///
/// A record is exclusively owned by one worker at a time. It is taken from a
/// `RecordPool`, parsed, pushed through the filter chain and returned to the
/// pool after the terminal stage has projected its output.
pub struct Record {
    layout: Layout,

    /// Original line, never mutated
    buffer: Bytes,

    /// Exclusive end offset of each field in `buffer`
    ends: Vec<usize>,

    /// Field index -> 1-based slot in `values` (0 = unmodified)
    ///
    /// Allocated to `max_fields` entries on the first `set`.
    slots: Vec<u8>,

    /// Replacement values in slot order
    values: Vec<(FieldIndex, Bytes)>,

    /// Highest modified field index, meaningful only when `values` is non-empty
    last_modified: FieldIndex,

    metadata: Option<Arc<Metadata>>,

    cache: RecordCache,
}

impl Record {
    /// Create an empty record
    pub fn new(layout: Layout) -> Self {
        Self {
            layout,
            buffer: Bytes::new(),
            ends: Vec::new(),
            slots: Vec::new(),
            values: Vec::new(),
            last_modified: 0,
            metadata: None,
            cache: RecordCache::new(),
        }
    }

    /// Layout this record was created with
    #[inline]
    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Parse a line into this record
    ///
    /// Any previous state is cleared first. The buffer is kept by reference,
    /// not copied.
    ///
    /// # Errors
    ///
    /// - `RecordError::Empty` for an empty buffer
    /// - `RecordError::TooManyFields` when the line holds more fields than the
    ///   layout allows; the record is left cleared, never truncated
    pub fn parse(&mut self, buffer: Bytes, metadata: Option<Arc<Metadata>>) -> Result<()> {
        self.clear();

        if buffer.is_empty() {
            return Err(RecordError::Empty);
        }

        let separator = self.layout.separator();
        let max = self.layout.max_fields();

        for (pos, &byte) in buffer.iter().enumerate() {
            if byte == separator {
                // This separator opens field number `ends.len() + 2`
                if self.ends.len() + 1 >= max {
                    self.ends.clear();
                    return Err(RecordError::TooManyFields { max });
                }
                self.ends.push(pos);
            }
        }
        self.ends.push(buffer.len());

        self.buffer = buffer;
        self.metadata = metadata;
        Ok(())
    }

    /// Get a field value
    ///
    /// Modified values take precedence over the parsed line. Indices beyond
    /// both read as empty.
    #[inline]
    pub fn get(&self, index: FieldIndex) -> &[u8] {
        if let Some(&slot) = self.slots.get(index)
            && slot != 0
        {
            return &self.values[slot as usize - 1].1;
        }
        self.original(index)
    }

    /// Get a field value as shared `Bytes`
    ///
    /// Same precedence as [`Record::get`], without copying: the result is a
    /// reference-counted slice of the overlay value or the backing buffer.
    pub fn get_bytes(&self, index: FieldIndex) -> Bytes {
        if let Some(&slot) = self.slots.get(index)
            && slot != 0
        {
            return self.values[slot as usize - 1].1.clone();
        }
        match self.ends.get(index) {
            Some(&end) => self.buffer.slice(self.start_of(index)..end),
            None => Bytes::new(),
        }
    }

    /// Get a field as it was parsed, ignoring modifications
    #[inline]
    pub fn original(&self, index: FieldIndex) -> &[u8] {
        match self.ends.get(index) {
            Some(&end) => &self.buffer[self.start_of(index)..end],
            None => &[],
        }
    }

    /// Replace a field value
    ///
    /// The value is taken by ownership and never copied. Re-setting an already
    /// modified field reuses its slot.
    ///
    /// # Errors
    ///
    /// - `RecordError::FieldOutOfRange` if `index >= max_fields`
    /// - `RecordError::OverlayFull` when a 256th distinct field is modified
    pub fn set(&mut self, index: FieldIndex, value: impl Into<Bytes>) -> Result<()> {
        let max = self.layout.max_fields();
        if index >= max {
            return Err(RecordError::FieldOutOfRange { index, max });
        }
        if self.slots.is_empty() {
            self.slots.resize(max, 0);
        }

        let value = value.into();
        match self.slots[index] {
            0 => {
                if self.values.len() >= MAX_MODIFIED_FIELDS {
                    return Err(RecordError::OverlayFull {
                        limit: MAX_MODIFIED_FIELDS,
                    });
                }
                if self.values.is_empty() || index > self.last_modified {
                    self.last_modified = index;
                }
                self.values.push((index, value));
                self.slots[index] = self.values.len() as u8;
            }
            slot => self.values[slot as usize - 1].1 = value,
        }
        Ok(())
    }

    /// Reset to the state of a freshly created record
    ///
    /// Allocations are kept so the record can be pooled.
    pub fn clear(&mut self) {
        for &(index, _) in &self.values {
            self.slots[index] = 0;
        }
        self.values.clear();
        self.last_modified = 0;
        self.ends.clear();
        self.buffer = Bytes::new();
        self.metadata = None;
        self.cache.clear();
    }

    /// Append the serialized record to `out`
    ///
    /// An unmodified record is copied verbatim. Otherwise fields are written
    /// up to the last modified index, joined by the separator, followed by the
    /// untouched tail of the original line.
    pub fn to_text(&self, out: &mut Vec<u8>) {
        if self.values.is_empty() {
            out.reserve(self.buffer.len());
            out.extend_from_slice(&self.buffer);
            return;
        }

        let separator = self.layout.separator();
        let last = self.last_modified;
        out.reserve(self.buffer.len() + self.modified_bytes() + last);

        for index in 0..=last {
            if index > 0 {
                out.push(separator);
            }
            out.extend_from_slice(self.get(index));
        }

        if last + 1 < self.ends.len() {
            out.push(separator);
            out.extend_from_slice(&self.buffer[self.ends[last] + 1..]);
        }
    }

    /// Serialized record as `Bytes`
    ///
    /// Zero-copy when no field was modified.
    pub fn to_bytes(&self) -> Bytes {
        if self.values.is_empty() {
            return self.buffer.clone();
        }
        let mut out = Vec::new();
        self.to_text(&mut out);
        Bytes::from(out)
    }

    /// Metadata value attached at parse time
    #[inline]
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.as_deref()?.get(key)
    }

    /// Shared metadata, if any
    #[inline]
    pub fn metadata(&self) -> Option<&Arc<Metadata>> {
        self.metadata.as_ref()
    }

    /// Per-record memo
    #[inline]
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    /// Per-record memo, mutable
    #[inline]
    pub fn cache_mut(&mut self) -> &mut RecordCache {
        &mut self.cache
    }

    /// Create an independent copy for fan-out
    ///
    /// The backing buffer and modified values are shared by reference count;
    /// writing to the copy only touches its own overlay. The cache is not
    /// carried over.
    pub fn duplicate(&self) -> Record {
        Record {
            layout: self.layout,
            buffer: self.buffer.clone(),
            ends: self.ends.clone(),
            slots: self.slots.clone(),
            values: self.values.clone(),
            last_modified: self.last_modified,
            metadata: self.metadata.clone(),
            cache: RecordCache::new(),
        }
    }

    /// Number of fields in the parsed line
    #[inline]
    pub fn field_count(&self) -> usize {
        self.ends.len()
    }

    /// Whether any field has been modified
    #[inline]
    pub fn is_modified(&self) -> bool {
        !self.values.is_empty()
    }

    /// Number of distinct modified fields
    #[inline]
    pub fn modified_count(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been parsed
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty() && self.values.is_empty()
    }

    /// Original line bytes
    #[inline]
    pub fn buffer(&self) -> &Bytes {
        &self.buffer
    }

    #[inline]
    fn start_of(&self, index: FieldIndex) -> usize {
        if index == 0 { 0 } else { self.ends[index - 1] + 1 }
    }

    fn modified_bytes(&self) -> usize {
        self.values.iter().map(|(_, v)| v.len()).sum()
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("buffer", &self.buffer)
            .field("fields", &self.ends.len())
            .field("modified", &self.values.len())
            .field("metadata", &self.metadata.as_ref().map(|m| m.len()))
            .finish()
    }
}
