//! Record validation functions
//!
//! A `Validator` is built once per topology and shared by the filter
//! workers, which run it before the chain, and by filters that derive new
//! records and want the same check applied to them.

use std::sync::Arc;

use crate::record::{FieldIndex, Record};

/// Record check returning the first offending field on failure
pub type Validator = Arc<dyn Fn(&Record) -> Result<(), FieldIndex> + Send + Sync>;

/// Build a validator requiring every field in `fields` to be non-empty
pub fn required_fields(fields: Vec<FieldIndex>) -> Validator {
    Arc::new(move |record: &Record| {
        match fields.iter().find(|&&i| record.get(i).is_empty()) {
            Some(&field) => Err(field),
            None => Ok(()),
        }
    })
}
