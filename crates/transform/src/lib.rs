//! Sluice - Transform
//!
//! Filter chain for per-record modification in-flight.
//!
//! # Overview
//!
//! Filters see one record at a time. They can:
//! - Modify fields (overwrite, normalize)
//! - Drop records
//! - Fan out one record into several derived records
//!
//! # Design Principles
//!
//! - **Fast**: Filters should add nanoseconds, not microseconds
//! - **Non-blocking**: Never block on I/O or external services
//! - **Thread-safe**: One filter instance is shared by every filter worker
//! - **Allocation-free chaining**: the continuation lives on the stack
//!
//! # Architecture
//!
//! ```text
//! [Record] → [Filter 1] → next.emit() → [Filter 2] → next.emit() → [terminal]
//! ```
//!
//! # Adding a New Filter
//!
//! 1. Implement [`Filter`] on your filter struct. Call `next.emit(record)`
//!    to pass a record on; return [`FilterError::Drop`] (or simply do not
//!    emit) to discard it.
//! 2. Implement [`FilterFactory`], resolving field names through
//!    [`FilterParams`] at construction so the hot path works on indices.
//! 3. Register the factory in [`default_registry()`] and add its name to
//!    `sluice_config::KNOWN_FILTER_TYPES`.
//!
//! # Modules
//!
//! - `chain` - Continuation-passing execution
//! - `registry` - Filter creation from config
//! - `noop` - Pass-through filter
//! - `set_field` - Overwrite a field with a constant
//! - `drop` - Drop records matching conditions
//! - `split` - Fan out one record per delimited piece of a field
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use sluice_record::Layout;
//! use sluice_transform::{Chain, NoopFilter, OnError};
//!
//! let chain = Chain::new(vec![Box::new(NoopFilter::new())], OnError::Drop);
//!
//! let mut record = Layout::new(b',', 4).unwrap().new_record();
//! record.parse(Bytes::from_static(b"a,b"), None).unwrap();
//!
//! let mut seen = 0;
//! chain.run(&mut record, &mut |_| seen += 1);
//! assert_eq!(seen, 1);
//! ```

mod chain;
pub mod drop;
mod error;
pub mod noop;
pub mod registry;
pub mod set_field;
pub mod split;

pub use chain::{Chain, Next, OnError};
pub use drop::{Condition, DropConfig, DropFactory, DropFilter, FilterAction, MatchMode, Operator};
pub use error::FilterError;
pub use noop::{NoopFactory, NoopFilter};
pub use registry::{FilterFactory, FilterParams, FilterRegistry, default_registry};
pub use set_field::{SetFieldFactory, SetFieldFilter};
pub use split::{SplitFactory, SplitFilter};

use sluice_metrics::Stats;
use sluice_record::Record;

/// Result type for filter operations
pub type FilterResult<T> = Result<T, FilterError>;

/// Trait for record filters
///
/// Implementors must be `Send + Sync`: a single instance is called
/// concurrently by every filter worker. Per-record state belongs in the
/// record's cache, not in the filter.
///
/// # Example
///
/// ```
/// use sluice_record::Record;
/// use sluice_transform::{Filter, FilterResult, Next};
///
/// struct Uppercase(usize);
///
/// impl Filter for Uppercase {
///     fn process(&self, record: &mut Record, next: &mut Next<'_, '_>) -> FilterResult<()> {
///         let value = record.get(self.0).to_ascii_uppercase();
///         record.set(self.0, value)?;
///         next.emit(record);
///         Ok(())
///     }
///
///     fn name(&self) -> &'static str {
///         "uppercase"
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Process one record
    ///
    /// Call `next.emit` zero, one or many times. Returning an error counts
    /// against this filter; the chain's error policy decides whether the
    /// record continues.
    fn process(&self, record: &mut Record, next: &mut Next<'_, '_>) -> FilterResult<()>;

    /// Name of this filter for logging and stats
    fn name(&self) -> &'static str;

    /// Filter-specific stats since the last call
    ///
    /// The chain adds its own processed/filtered/error counts on top.
    fn stats(&self) -> Stats {
        Stats::new()
    }

    /// Whether this filter is currently enabled
    ///
    /// Disabled filters are left out of chains at construction time.
    fn enabled(&self) -> bool {
        true
    }
}
