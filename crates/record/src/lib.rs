//! Sluice - Record
//!
//! The unit of data flowing through the pipeline: a mutable view over an
//! immutable parsed line plus a sparse overlay of modifications.
//!
//! # Architecture
//!
//! ```text
//! buffer:  [ hello 0x1E world 0x1E 0x1E ]      (immutable, shared Bytes)
//! ends:    [ 5, 11, 12, 12 ]                    (one entry per field)
//! slots:   [ 0, 1, 0, 0, ... ]                  (field -> 1-based slot)
//! values:  [ (1, "WORLD") ]                     (dense overlay)
//! ```
//!
//! - **Zero-copy**: parsing shares the batch buffer, `get` never allocates
//! - **Overlay mutation**: `set` never touches the original bytes
//! - **Fast serialization**: an unmodified record serializes as one copy
//! - **Poolable**: `clear` keeps capacity so `RecordPool` can recycle records
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use sluice_record::{Layout, Record};
//!
//! let layout = Layout::new(b',', 8).unwrap();
//! let mut record = Record::new(layout);
//! record.parse(Bytes::from_static(b"a,b"), None).unwrap();
//! record.set(0, "X").unwrap();
//!
//! let mut out = Vec::new();
//! record.to_text(&mut out);
//! assert_eq!(out, b"X,b");
//! ```

mod cache;
mod error;
mod fields;
mod layout;
mod meta;
mod pool;
mod record;
mod validator;

pub use cache::RecordCache;
pub use error::{RecordError, Result};
pub use fields::FieldMap;
pub use layout::{
    DEFAULT_MAX_FIELDS, DEFAULT_SEPARATOR, Layout, MAX_FIELDS_LIMIT, RecordFactory,
};
pub use meta::Metadata;
pub use pool::{PoolMetrics, PoolSnapshot, RecordPool};
pub use record::{FieldIndex, MAX_MODIFIED_FIELDS, Record};
pub use validator::{Validator, required_fields};
