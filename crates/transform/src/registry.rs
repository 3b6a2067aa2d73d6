//! Filter Registry - Dynamic filter creation
//!
//! The registry maps filter type names to factories, enabling
//! configuration-driven chain construction.
//!
//! # Example
//!
//! ```
//! use sluice_config::{FilterInstanceConfig, OnErrorPolicy};
//! use sluice_record::{FieldMap, Layout};
//! use sluice_transform::default_registry;
//!
//! let fields = FieldMap::new(["host", "env"]).unwrap();
//! let configs = vec![
//!     FilterInstanceConfig::new("set_field")
//!         .with_option("field", "env")
//!         .with_option("value", "prod"),
//! ];
//!
//! let chain = default_registry()
//!     .build_chain(&configs, &fields, Layout::default(), None, OnErrorPolicy::Drop.into())
//!     .unwrap();
//! assert_eq!(chain.names(), vec!["set_field"]);
//! ```

use crate::{Chain, Filter, FilterError, FilterResult, OnError};
use sluice_config::FilterInstanceConfig;
use sluice_metrics::{MetricsClient, metrics_client};
use sluice_record::{FieldIndex, FieldMap, Layout, Validator};
use std::collections::HashMap;

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;

/// Everything a factory needs to build one filter instance
pub struct FilterParams<'a> {
    /// Decoded filter configuration
    pub config: &'a FilterInstanceConfig,

    /// Field name ↔ index mapping
    pub fields: &'a FieldMap,

    /// Record layout of the topology; `layout.factory()` creates records
    pub layout: Layout,

    /// Topology record check, if validation is configured
    pub validator: Option<Validator>,

    /// This instance's own handle for component-specific samples
    pub metrics: MetricsClient,
}

impl<'a> FilterParams<'a> {
    /// Create params for one filter config, without validation
    pub fn new(config: &'a FilterInstanceConfig, fields: &'a FieldMap, layout: Layout) -> Self {
        Self {
            config,
            fields,
            layout,
            validator: None,
            metrics: metrics_client(),
        }
    }

    /// Attach the topology's validator (builder style)
    pub fn with_validator(mut self, validator: Option<Validator>) -> Self {
        self.validator = validator;
        self
    }

    /// Get a string option
    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.config.get_str(key)
    }

    /// Get a required string option
    pub fn required_str(&self, key: &str) -> FilterResult<&'a str> {
        self.str(key).ok_or_else(|| {
            FilterError::config(format!(
                "{} filter requires option '{}'",
                self.config.filter_type, key
            ))
        })
    }

    /// Get a bool option with a default
    pub fn bool_or(&self, key: &str, default: bool) -> bool {
        self.config.get_bool(key).unwrap_or(default)
    }

    /// Resolve a field name option to its index
    pub fn field(&self, key: &str) -> FilterResult<FieldIndex> {
        let name = self.required_str(key)?;
        self.resolve(name)
    }

    /// Resolve a field name to its index
    pub fn resolve(&self, name: &str) -> FilterResult<FieldIndex> {
        self.fields.index_of(name).ok_or_else(|| {
            FilterError::config(format!(
                "{} filter references unknown field '{}'",
                self.config.filter_type, name
            ))
        })
    }
}

/// Factory trait for creating filters
///
/// Implement this trait to register custom filters with the registry.
pub trait FilterFactory: Send + Sync {
    /// Create a filter instance
    ///
    /// # Errors
    /// Returns `FilterError::Config` if configuration is invalid
    fn create(&self, params: &FilterParams<'_>) -> FilterResult<Box<dyn Filter>>;

    /// Human-readable name for this factory (for error messages)
    fn name(&self) -> &'static str;
}

/// Registry for filter factories
///
/// Maps filter type names (e.g., "noop", "drop") to their factories.
pub struct FilterRegistry {
    factories: HashMap<String, Box<dyn FilterFactory>>,
}

impl FilterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a filter factory
    ///
    /// # Panics
    /// Panics if a factory is already registered with this name.
    /// Use `try_register` for fallible registration.
    pub fn register<F: FilterFactory + 'static>(&mut self, type_name: &str, factory: F) {
        if self.factories.contains_key(type_name) {
            panic!("Filter factory '{}' already registered", type_name);
        }
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
    }

    /// Try to register a filter factory
    ///
    /// Returns `false` if a factory is already registered with this name.
    pub fn try_register<F: FilterFactory + 'static>(&mut self, type_name: &str, factory: F) -> bool {
        if self.factories.contains_key(type_name) {
            return false;
        }
        self.factories
            .insert(type_name.to_string(), Box::new(factory));
        true
    }

    /// Create a filter from its params
    ///
    /// # Errors
    /// - `FilterError::Config` if the type is not registered
    /// - `FilterError::Config` if the factory rejects the configuration
    pub fn create(&self, params: &FilterParams<'_>) -> FilterResult<Box<dyn Filter>> {
        let type_name = params.config.filter_type.as_str();
        let factory = self.factories.get(type_name).ok_or_else(|| {
            let mut available = self.available_types();
            available.sort_unstable();
            FilterError::config(format!(
                "unknown filter type '{}', available: [{}]",
                type_name,
                available.join(", ")
            ))
        })?;

        factory.create(params)
    }

    /// Build a chain from filter configs, in order
    ///
    /// Disabled configs are skipped. Every filter gets its own metrics
    /// handle and a share of `validator`.
    pub fn build_chain(
        &self,
        configs: &[FilterInstanceConfig],
        fields: &FieldMap,
        layout: Layout,
        validator: Option<&Validator>,
        on_error: OnError,
    ) -> FilterResult<Chain> {
        let filters = configs
            .iter()
            .filter(|c| c.enabled)
            .map(|config| {
                let params = FilterParams::new(config, fields, layout)
                    .with_validator(validator.cloned());
                self.create(&params)
            })
            .collect::<FilterResult<Vec<_>>>()?;

        Ok(Chain::new(filters, on_error))
    }

    /// Check if a filter type is registered
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Get list of registered filter types
    pub fn available_types(&self) -> Vec<&str> {
        self.factories.keys().map(|s| s.as_str()).collect()
    }

    /// Get the number of registered factories
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with all built-in filters registered
///
/// Includes:
/// - `noop` - Pass-through filter
/// - `set_field` - Overwrite a field with a constant
/// - `drop` - Drop records matching conditions
/// - `split` - Fan out one record per delimited piece of a field
pub fn default_registry() -> FilterRegistry {
    let mut registry = FilterRegistry::new();
    registry.register("noop", crate::NoopFactory);
    registry.register("set_field", crate::SetFieldFactory);
    registry.register("drop", crate::DropFactory);
    registry.register("split", crate::SplitFactory);
    registry
}
