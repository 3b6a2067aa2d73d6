//! Filter error types
//!
//! Errors a filter can return for a single record. None of them abort the
//! chain: the chain counts them and applies its error policy.

use sluice_record::RecordError;
use thiserror::Error;

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

/// Errors that can occur while filtering a record
#[derive(Debug, Error)]
pub enum FilterError {
    /// Discard this record
    ///
    /// Counted as filtered, not as an error. The error policy is not applied.
    #[error("record dropped")]
    Drop,

    /// Filter logic failed for this record
    #[error("filter failed: {0}")]
    Failed(String),

    /// Record access failed (e.g., overlay full)
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Invalid configuration (construction only)
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl FilterError {
    /// Create a failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether this is the documented "discard this record" kind
    pub fn is_drop(&self) -> bool {
        matches!(self, Self::Drop)
    }
}
