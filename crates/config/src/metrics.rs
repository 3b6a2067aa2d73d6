//! Stats reporting configuration
//!
//! Controls the periodic stats dump of a running topology.
//!
//! # Defaults
//!
//! - `enabled`: true
//! - `interval`: 10s
//! - `format`: human
//! - `include_invalid_fields`: true

use serde::Deserialize;
use std::time::Duration;

/// Stats output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// JSON structured output
    Json,
}

/// Stats reporting configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "30s"
/// format = "json"
/// include_invalid_fields = false
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable periodic stats reporting
    pub enabled: bool,

    /// Collection interval
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Output format (human, json)
    pub format: MetricsFormat,

    /// Include the per-field breakdown of validation failures
    pub include_invalid_fields: bool,

    /// Emit a final report when the topology terminates
    pub report_on_exit: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(10),
            format: MetricsFormat::Human,
            include_invalid_fields: true,
            report_on_exit: true,
        }
    }
}
