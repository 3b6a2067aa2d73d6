//! Record error types

use thiserror::Error;

/// Result type for record operations
pub type Result<T> = std::result::Result<T, RecordError>;

/// Errors produced while parsing or mutating a record
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// The line had no bytes at all
    #[error("empty record")]
    Empty,

    /// The line had more fields than the layout supports
    ///
    /// The record is left in its cleared state.
    #[error("record has more than {max} fields")]
    TooManyFields {
        /// Configured field limit
        max: usize,
    },

    /// A write targeted an index outside the layout
    #[error("field index {index} is out of range (layout supports {max} fields)")]
    FieldOutOfRange {
        /// Requested field index
        index: usize,
        /// Configured field limit
        max: usize,
    },

    /// Too many distinct fields were modified on one record
    #[error("overlay full: at most {limit} distinct fields can be modified per record")]
    OverlayFull {
        /// Overlay slot limit
        limit: usize,
    },

    /// A field name is not part of the field map
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// A field name appears twice in the field map
    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    /// Separator or field limit is unusable
    #[error("invalid layout: {0}")]
    InvalidLayout(String),
}
