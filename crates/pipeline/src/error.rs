//! Pipeline error types
//!
//! `TopologyError` covers construction and lifecycle failures of the
//! orchestrator. `ComponentError` is what a Source or Uploader returns from
//! its run loop.

use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::topology::TopologyState;

/// Errors returned by a component's run loop
#[derive(Debug, Error)]
pub enum ComponentError {
    /// I/O failure
    #[error("{context}: {source}")]
    Io {
        /// What the component was doing
        context: String,
        #[source]
        source: io::Error,
    },

    /// Component-specific failure
    #[error("{0}")]
    Failed(String),

    /// The component's worker thread panicked
    #[error("{component} worker panicked: {message}")]
    Panicked {
        /// Component name
        component: &'static str,
        /// Panic payload, if it was a string
        message: String,
    },
}

impl ComponentError {
    /// Create an I/O error with context
    pub fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a failed error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Topology construction and lifecycle errors
#[derive(Debug, Error)]
pub enum TopologyError {
    /// No sink instance was configured
    #[error("topology requires at least one sink")]
    NoSink,

    /// A queue capacity or worker count is zero
    #[error("{name} must be at least 1")]
    InvalidSize {
        /// Parameter name
        name: &'static str,
    },

    /// A field name is not part of the field map
    #[error("unknown {role} field '{field}'")]
    UnknownField {
        /// Where the name was used ("output", "shard")
        role: &'static str,
        /// The offending name
        field: String,
    },

    /// A sink projects fields but no output field is configured
    #[error("sink '{sink}' needs output fields but none are configured")]
    MissingOutputFields {
        /// Sink name
        sink: &'static str,
    },

    /// Sharding was requested on a sink that cannot shard
    #[error("sink '{sink}' does not support sharding")]
    ShardingUnsupported {
        /// Sink name
        sink: &'static str,
    },

    /// Lifecycle method called in the wrong state
    #[error("cannot {operation} a topology in state {state}")]
    InvalidState {
        /// Attempted operation
        operation: &'static str,
        /// Current state
        state: TopologyState,
    },

    /// A worker thread could not be spawned
    #[error("failed to spawn {worker} thread: {source}")]
    Spawn {
        /// Worker name
        worker: String,
        #[source]
        source: io::Error,
    },

    /// The source failed; records produced before the failure were delivered
    #[error("source failed: {0}")]
    Source(#[source] Arc<ComponentError>),
}

/// Result type for topology operations
pub type Result<T> = std::result::Result<T, TopologyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_error_display() {
        let err = ComponentError::io(
            "reading /tmp/in.log",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(err.to_string(), "reading /tmp/in.log: gone");
        assert!(std::error::Error::source(&err).is_some());

        let err = ComponentError::failed("bad handshake");
        assert_eq!(err.to_string(), "bad handshake");

        let err = ComponentError::Panicked {
            component: "memory",
            message: "boom".into(),
        };
        assert_eq!(err.to_string(), "memory worker panicked: boom");
    }

    #[test]
    fn test_topology_error_display() {
        assert!(TopologyError::NoSink.to_string().contains("at least one sink"));

        let err = TopologyError::InvalidSize {
            name: "filter_workers",
        };
        assert_eq!(err.to_string(), "filter_workers must be at least 1");

        let err = TopologyError::UnknownField {
            role: "shard",
            field: "user".into(),
        };
        assert_eq!(err.to_string(), "unknown shard field 'user'");

        let err = TopologyError::ShardingUnsupported { sink: "stdout" };
        assert!(err.to_string().contains("stdout"));

        let err = TopologyError::InvalidState {
            operation: "start",
            state: TopologyState::Terminated,
        };
        assert_eq!(err.to_string(), "cannot start a topology in state terminated");
    }

    #[test]
    fn test_source_error_keeps_cause() {
        let cause = Arc::new(ComponentError::failed("connection reset"));
        let err = TopologyError::Source(cause.clone());

        assert_eq!(err.to_string(), "source failed: connection reset");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "connection reset");
    }
}
