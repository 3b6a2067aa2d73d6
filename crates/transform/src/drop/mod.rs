//! Drop Filter - Drop unwanted records
//!
//! Drops records based on conditions over their fields.
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | `action` | string | `"drop"` | Action when conditions match: `drop` or `keep` |
//! | `match` | string | `"all"` | How to combine conditions: `all` (AND) or `any` (OR) |
//! | `field` | string | - | Field of a single condition |
//! | `condition` | string | `"eq"` | Operator of a single condition |
//! | `value` | string | - | Value of a single condition |
//! | `conditions` | array | - | Tables with `field`, `condition`, `value` |
//!
//! At least one condition is required.
//!
//! ## Operators
//!
//! | Operator | Description |
//! |----------|-------------|
//! | `eq` | Equal to value |
//! | `ne` | Not equal to value |
//! | `contains` | Contains value |
//! | `starts_with` | Starts with value |
//! | `ends_with` | Ends with value |
//! | `empty` | Field is empty or absent (value ignored) |
//! | `regex` | Matches regex pattern |
//! | `gt` / `lt` / `gte` / `lte` | Numeric comparison |
//!
//! # TOML Examples
//!
//! ```toml
//! # Drop debug lines
//! [[filters]]
//! type = "drop"
//! field = "level"
//! condition = "eq"
//! value = "debug"
//! ```
//!
//! ```toml
//! # Keep only errors from production
//! [[filters]]
//! type = "drop"
//! action = "keep"
//! match = "all"
//!
//! [[filters.conditions]]
//! field = "level"
//! value = "error"
//!
//! [[filters.conditions]]
//! field = "env"
//! value = "production"
//! ```

mod config;

pub use config::{Condition, DropConfig, FilterAction, MatchMode, Operator};

use crate::registry::{FilterFactory, FilterParams};
use crate::{Filter, FilterError, FilterResult, Next};
use sluice_metrics::{Counter, MetricsBag, Stats};
use sluice_record::Record;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

/// Drop filter
///
/// Stateless apart from its counters.
#[derive(Debug)]
pub struct DropFilter {
    config: DropConfig,
    matched: Counter,
}

impl DropFilter {
    /// Create a new drop filter
    pub fn new(config: DropConfig) -> FilterResult<Self> {
        config.validate().map_err(FilterError::config)?;

        Ok(Self {
            config,
            matched: Counter::new(),
        })
    }

    /// Check if a record matches the conditions
    fn matches(&self, record: &Record) -> bool {
        let mut conditions = self.config.conditions.iter();
        match self.config.match_mode {
            MatchMode::All => conditions.all(|c| c.matches(record.get(c.field))),
            MatchMode::Any => conditions.any(|c| c.matches(record.get(c.field))),
        }
    }
}

impl Filter for DropFilter {
    fn process(&self, record: &mut Record, next: &mut Next<'_, '_>) -> FilterResult<()> {
        let matches = self.matches(record);
        if matches {
            self.matched.inc();
        }

        let keep = match self.config.action {
            FilterAction::Drop => !matches,
            FilterAction::Keep => matches,
        };

        if !keep {
            return Err(FilterError::Drop);
        }
        next.emit(record);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "drop"
    }

    fn stats(&self) -> Stats {
        let mut bag = MetricsBag::new();
        bag.counter("matched", self.matched.get());
        Stats::new().with_bag(bag)
    }
}

/// Factory for the drop filter
#[derive(Debug, Clone, Copy)]
pub struct DropFactory;

impl FilterFactory for DropFactory {
    fn create(&self, params: &FilterParams<'_>) -> FilterResult<Box<dyn Filter>> {
        let config = DropConfig::from_params(params)?;
        Ok(Box::new(DropFilter::new(config)?))
    }

    fn name(&self) -> &'static str {
        "drop"
    }
}
