//! Split Filter - one record per delimited piece of a field
//!
//! A record whose field holds `a,b,c` leaves the filter as three records
//! carrying `a`, `b` and `c` in that field. All other fields are shared
//! with the input record by reference count.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | `field` | string | required | Field to split |
//! | `delimiter` | string | `","` | Piece separator, may be several bytes |
//! | `keep_empty` | bool | `false` | Emit empty pieces too |
//!
//! A field with no pieces (empty, or only delimiters without
//! `keep_empty`) passes through unchanged.
//!
//! When the topology has a validator, every record the filter derives is
//! checked again; pieces that fail are not emitted and are counted as
//! `rejected`.

use crate::registry::{FilterFactory, FilterParams};
use crate::{Filter, FilterError, FilterResult, Next};
use bytes::Bytes;
use sluice_metrics::{MetricsClient, Stats, metrics_client};
use sluice_record::{FieldIndex, Record, Validator};
use std::ops::Range;

#[cfg(test)]
#[path = "split_test.rs"]
mod tests;

/// Default piece separator
pub const DEFAULT_DELIMITER: &str = ",";

/// Fans one record out into one record per piece
pub struct SplitFilter {
    field: FieldIndex,
    delimiter: Bytes,
    keep_empty: bool,
    validator: Option<Validator>,
    metrics: MetricsClient,
}

impl SplitFilter {
    /// Create a filter splitting `field` on `delimiter`
    ///
    /// # Errors
    /// Returns `FilterError::Config` for an empty delimiter
    pub fn new(field: FieldIndex, delimiter: impl Into<Bytes>) -> FilterResult<Self> {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Err(FilterError::config("split delimiter must not be empty"));
        }
        Ok(Self {
            field,
            delimiter,
            keep_empty: false,
            validator: None,
            metrics: metrics_client(),
        })
    }

    /// Emit empty pieces (builder style)
    pub fn keep_empty(mut self, keep_empty: bool) -> Self {
        self.keep_empty = keep_empty;
        self
    }

    /// Check derived records with `validator` (builder style)
    pub fn validator(mut self, validator: Option<Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Record samples into `metrics` (builder style)
    pub fn metrics(mut self, metrics: MetricsClient) -> Self {
        self.metrics = metrics;
        self
    }

    fn accepts(&self, record: &Record) -> bool {
        self.validator.as_ref().is_none_or(|validate| validate(record).is_ok())
    }

    fn pieces<'a>(&'a self, value: &'a [u8]) -> impl Iterator<Item = Range<usize>> + 'a {
        Pieces {
            value,
            delimiter: &self.delimiter,
            pos: Some(0),
        }
        .filter(move |range| self.keep_empty || !range.is_empty())
    }
}

impl Filter for SplitFilter {
    fn process(&self, record: &mut Record, next: &mut Next<'_, '_>) -> FilterResult<()> {
        let value = record.get_bytes(self.field);

        // The last piece reuses the input record, earlier ones are copies
        let mut pending: Option<Range<usize>> = None;
        let mut emitted = 0u64;
        let mut rejected = 0u64;
        for range in self.pieces(&value) {
            if let Some(previous) = pending.replace(range) {
                let mut copy = record.duplicate();
                copy.set(self.field, value.slice(previous))?;
                if self.accepts(&copy) {
                    next.emit(&mut copy);
                    emitted += 1;
                } else {
                    rejected += 1;
                }
            }
        }

        match pending {
            None => {
                next.emit(record);
                emitted += 1;
            }
            Some(last) => {
                if last != (0..value.len()) {
                    record.set(self.field, value.slice(last))?;
                }
                if self.accepts(record) {
                    next.emit(record);
                    emitted += 1;
                } else {
                    rejected += 1;
                }
            }
        }

        let mut bag = self.metrics.lock();
        if emitted + rejected > 1 {
            bag.counter("split", 1);
        }
        bag.counter("pieces", emitted);
        if rejected > 0 {
            bag.counter("rejected", rejected);
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "split"
    }

    fn stats(&self) -> Stats {
        Stats::new().with_bag(self.metrics.lock().snapshot())
    }
}

impl std::fmt::Debug for SplitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SplitFilter")
            .field("field", &self.field)
            .field("delimiter", &self.delimiter)
            .field("keep_empty", &self.keep_empty)
            .field("validator", &self.validator.is_some())
            .finish()
    }
}

/// Byte ranges between delimiter occurrences
struct Pieces<'a> {
    value: &'a [u8],
    delimiter: &'a [u8],
    pos: Option<usize>,
}

impl Iterator for Pieces<'_> {
    type Item = Range<usize>;

    fn next(&mut self) -> Option<Range<usize>> {
        let start = self.pos?;
        if self.value.is_empty() {
            self.pos = None;
            return None;
        }
        let rest = &self.value[start..];
        match rest
            .windows(self.delimiter.len())
            .position(|w| w == self.delimiter)
        {
            Some(offset) => {
                self.pos = Some(start + offset + self.delimiter.len());
                Some(start..start + offset)
            }
            None => {
                self.pos = None;
                Some(start..self.value.len())
            }
        }
    }
}

/// Factory for the split filter
#[derive(Debug, Clone, Copy)]
pub struct SplitFactory;

impl FilterFactory for SplitFactory {
    fn create(&self, params: &FilterParams<'_>) -> FilterResult<Box<dyn Filter>> {
        let field = params.field("field")?;
        let delimiter = params.str("delimiter").unwrap_or(DEFAULT_DELIMITER);
        let filter = SplitFilter::new(field, Bytes::copy_from_slice(delimiter.as_bytes()))?
            .keep_empty(params.bool_or("keep_empty", false))
            .validator(params.validator.clone())
            .metrics(params.metrics.clone());
        Ok(Box::new(filter))
    }

    fn name(&self) -> &'static str {
        "split"
    }
}
