//! Filter configuration
//!
//! Filters run in declaration order on every record. Each filter has a type
//! and type-specific options that are handed to the filter factory.
//!
//! # Example
//!
//! ```toml
//! [[filters]]
//! type = "drop"
//! field = "level"
//! condition = "eq"
//! value = "debug"
//!
//! [[filters]]
//! type = "set_field"
//! field = "env"
//! value = "prod"
//! ```

use serde::Deserialize;
use std::collections::HashMap;

/// Configuration for a single filter instance
#[derive(Debug, Clone, Deserialize)]
pub struct FilterInstanceConfig {
    /// Filter type (e.g., "noop", "drop")
    #[serde(rename = "type")]
    pub filter_type: String,

    /// Whether this filter is enabled (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Type-specific configuration options
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

fn default_true() -> bool {
    true
}

impl FilterInstanceConfig {
    /// Create an enabled filter config with no options
    pub fn new(filter_type: impl Into<String>) -> Self {
        Self {
            filter_type: filter_type.into(),
            enabled: true,
            options: HashMap::new(),
        }
    }

    /// Add an option (builder style)
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Get an option as string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.options.get(key).and_then(|v| v.as_str())
    }

    /// Get an option as bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.options.get(key).and_then(|v| v.as_bool())
    }

    /// Get an option as i64
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.options.get(key).and_then(|v| v.as_integer())
    }

    /// Get an array option as Vec<String>
    pub fn get_string_array(&self, key: &str) -> Option<Vec<String>> {
        self.options.get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect()
            })
        })
    }
}

/// Known filter types for validation
pub const KNOWN_FILTER_TYPES: &[&str] = &["noop", "set_field", "drop", "split"];

/// Check if a filter type is known
pub fn is_known_filter_type(filter_type: &str) -> bool {
    KNOWN_FILTER_TYPES.contains(&filter_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_noop() {
        let config: FilterInstanceConfig = toml::from_str(r#"type = "noop""#).unwrap();
        assert_eq!(config.filter_type, "noop");
        assert!(config.enabled);
        assert!(config.options.is_empty());
    }

    #[test]
    fn test_deserialize_with_options() {
        let toml = r#"
type = "drop"
field = "level"
condition = "eq"
value = "debug"
"#;
        let config: FilterInstanceConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.filter_type, "drop");
        assert_eq!(config.get_str("field"), Some("level"));
        assert_eq!(config.get_str("condition"), Some("eq"));
        assert_eq!(config.get_str("value"), Some("debug"));
    }

    #[test]
    fn test_deserialize_disabled() {
        let toml = r#"
type = "split"
enabled = false
"#;
        let config: FilterInstanceConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
    }

    #[test]
    fn test_builder() {
        let config = FilterInstanceConfig::new("set_field")
            .with_option("field", "env")
            .with_option("value", "prod");
        assert_eq!(config.get_str("field"), Some("env"));
        assert_eq!(config.get_str("value"), Some("prod"));
    }

    #[test]
    fn test_known_filter_types() {
        assert!(is_known_filter_type("noop"));
        assert!(is_known_filter_type("split"));
        assert!(!is_known_filter_type("regex"));
    }

    #[test]
    fn test_get_missing_option() {
        let config = FilterInstanceConfig::new("noop");
        assert_eq!(config.get_bool("missing"), None);
        assert_eq!(config.get_int("missing"), None);
        assert_eq!(config.get_str("missing"), None);
        assert_eq!(config.get_string_array("missing"), None);
    }
}
