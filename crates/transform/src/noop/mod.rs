//! Noop Filter - Pass-through filter for testing
//!
//! The `NoopFilter` emits every record unchanged. It's useful for:
//! - Testing the chain infrastructure
//! - Benchmarking chain overhead
//! - Placeholder in development

use crate::registry::{FilterFactory, FilterParams};
use crate::{Filter, FilterResult, Next};
use sluice_record::Record;


/// A filter that passes records through unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFilter;

impl NoopFilter {
    /// Create a new noop filter
    #[inline]
    pub const fn new() -> Self {
        Self
    }
}

impl Filter for NoopFilter {
    #[inline]
    fn process(&self, record: &mut Record, next: &mut Next<'_, '_>) -> FilterResult<()> {
        next.emit(record);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

/// Factory for the noop filter
#[derive(Debug, Clone, Copy)]
pub struct NoopFactory;

impl FilterFactory for NoopFactory {
    fn create(&self, _params: &FilterParams<'_>) -> FilterResult<Box<dyn Filter>> {
        Ok(Box::new(NoopFilter::new()))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}
