//! Configuration error types

use std::io;
use thiserror::Error;

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file
    #[error("failed to read config file '{path}': {source}")]
    IoError {
        /// Path to the file
        path: String,
        /// Underlying IO error
        #[source]
        source: io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// A section references a field name not declared in `[record].fields`
    #[error("{section} references unknown field '{field}'")]
    UnknownField {
        /// Section holding the reference (e.g., "topology.output_fields")
        section: &'static str,
        /// Name of the missing field
        field: String,
    },

    /// A filter type is not known to the registry
    #[error("unknown filter type '{0}'")]
    UnknownFilterType(String),

    /// Validation error - required field missing
    #[error("{component} is missing required field '{field}'")]
    MissingField {
        /// Component type (e.g., "sink", "source")
        component: &'static str,
        /// Missing field name
        field: &'static str,
    },

    /// Validation error - invalid value
    #[error("{component} has invalid {field}: {message}")]
    InvalidValue {
        /// Component type
        component: &'static str,
        /// Field name
        field: &'static str,
        /// Error message
        message: String,
    },
}

impl ConfigError {
    /// Create an UnknownField error
    pub fn unknown_field(section: &'static str, field: impl Into<String>) -> Self {
        Self::UnknownField {
            section,
            field: field.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(component: &'static str, field: &'static str) -> Self {
        Self::MissingField { component, field }
    }

    /// Create an InvalidValue error
    pub fn invalid_value(
        component: &'static str,
        field: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            component,
            field,
            message: message.into(),
        }
    }
}
