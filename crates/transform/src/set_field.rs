//! Set Field Filter - overwrite a field with a constant
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | `field` | string | required | Field to overwrite |
//! | `value` | string | required | Replacement value |
//! | `only_if_empty` | bool | `false` | Leave non-empty fields untouched |
//!
//! ```toml
//! [[filters]]
//! type = "set_field"
//! field = "env"
//! value = "prod"
//! ```

use crate::registry::{FilterFactory, FilterParams};
use crate::{Filter, FilterResult, Next};
use bytes::Bytes;
use sluice_metrics::{Counter, MetricsBag, Stats};
use sluice_record::{FieldIndex, Record};

#[cfg(test)]
#[path = "set_field_test.rs"]
mod tests;

/// Overwrites one field with a constant value
///
/// The value is shared by reference count, so setting it never copies.
#[derive(Debug)]
pub struct SetFieldFilter {
    field: FieldIndex,
    value: Bytes,
    only_if_empty: bool,
    written: Counter,
}

impl SetFieldFilter {
    /// Create a filter writing `value` into `field`
    pub fn new(field: FieldIndex, value: impl Into<Bytes>) -> Self {
        Self {
            field,
            value: value.into(),
            only_if_empty: false,
            written: Counter::new(),
        }
    }

    /// Only write when the current value is empty (builder style)
    pub fn only_if_empty(mut self, only_if_empty: bool) -> Self {
        self.only_if_empty = only_if_empty;
        self
    }
}

impl Filter for SetFieldFilter {
    fn process(&self, record: &mut Record, next: &mut Next<'_, '_>) -> FilterResult<()> {
        if !self.only_if_empty || record.get(self.field).is_empty() {
            record.set(self.field, self.value.clone())?;
            self.written.inc();
        }
        next.emit(record);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "set_field"
    }

    fn stats(&self) -> Stats {
        let mut bag = MetricsBag::new();
        bag.counter("written", self.written.get());
        Stats::new().with_bag(bag)
    }
}

/// Factory for the set_field filter
#[derive(Debug, Clone, Copy)]
pub struct SetFieldFactory;

impl FilterFactory for SetFieldFactory {
    fn create(&self, params: &FilterParams<'_>) -> FilterResult<Box<dyn Filter>> {
        let field = params.field("field")?;
        let value = params.required_str("value")?;
        let filter = SetFieldFilter::new(field, Bytes::copy_from_slice(value.as_bytes()))
            .only_if_empty(params.bool_or("only_if_empty", false));
        Ok(Box::new(filter))
    }

    fn name(&self) -> &'static str {
        "set_field"
    }
}
