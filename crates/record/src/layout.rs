//! Record layout - separator and field capacity
//!
//! A `Layout` is configured once per topology and copied into every record.

use std::sync::Arc;

use crate::error::{RecordError, Result};
use crate::record::Record;

/// Default field separator: ASCII record separator (0x1E)
pub const DEFAULT_SEPARATOR: u8 = 0x1E;

/// Default maximum number of fields per record
pub const DEFAULT_MAX_FIELDS: usize = 64;

/// Upper bound accepted for `max_fields`
pub const MAX_FIELDS_LIMIT: usize = 4096;

/// Function producing fresh records with the topology's layout
pub type RecordFactory = Arc<dyn Fn() -> Record + Send + Sync>;

/// Field separator and capacity shared by all records of a topology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    separator: u8,
    max_fields: usize,
}

impl Layout {
    /// Create a layout
    ///
    /// # Errors
    ///
    /// Returns `RecordError::InvalidLayout` if the separator is a line
    /// terminator or `max_fields` is zero or above `MAX_FIELDS_LIMIT`.
    pub fn new(separator: u8, max_fields: usize) -> Result<Self> {
        if separator == b'\n' || separator == b'\r' {
            return Err(RecordError::InvalidLayout(
                "separator cannot be a line terminator".into(),
            ));
        }
        if max_fields == 0 || max_fields > MAX_FIELDS_LIMIT {
            return Err(RecordError::InvalidLayout(format!(
                "max_fields must be between 1 and {MAX_FIELDS_LIMIT}, got {max_fields}"
            )));
        }
        Ok(Self {
            separator,
            max_fields,
        })
    }

    /// Field separator byte
    #[inline]
    pub fn separator(&self) -> u8 {
        self.separator
    }

    /// Maximum number of fields a record may hold
    #[inline]
    pub fn max_fields(&self) -> usize {
        self.max_fields
    }

    /// Create an empty record with this layout
    pub fn new_record(&self) -> Record {
        Record::new(*self)
    }

    /// Create a record factory for this layout
    pub fn factory(&self) -> RecordFactory {
        let layout = *self;
        Arc::new(move || Record::new(layout))
    }
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR,
            max_fields: DEFAULT_MAX_FIELDS,
        }
    }
}
