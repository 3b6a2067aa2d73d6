//! Drop filter configuration

use crate::registry::FilterParams;
use crate::{FilterError, FilterResult};
use bytes::Bytes;
use regex::bytes::Regex;
use sluice_record::FieldIndex;

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;

/// What to do when the conditions match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterAction {
    /// Drop records that match
    #[default]
    Drop,
    /// Keep only records that match (drop non-matches)
    Keep,
}

/// How to combine multiple conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// All conditions must match (AND)
    #[default]
    All,
    /// Any condition must match (OR)
    Any,
}

/// Comparison applied to one field
#[derive(Debug, Clone)]
pub enum Operator {
    /// Equals
    Eq,
    /// Not equals
    Ne,
    /// Contains the value as a substring
    Contains,
    /// Starts with the value
    StartsWith,
    /// Ends with the value
    EndsWith,
    /// Field is empty or absent (value ignored)
    Empty,
    /// Matches the regex
    Regex(Regex),
    /// Greater than (numeric)
    Gt,
    /// Less than (numeric)
    Lt,
    /// Greater than or equal (numeric)
    Gte,
    /// Less than or equal (numeric)
    Lte,
}

impl Operator {
    /// Parse an operator name; `regex` compiles `value`
    pub fn parse(name: &str, value: Option<&str>) -> Result<Self, String> {
        match name {
            "eq" => Ok(Self::Eq),
            "ne" => Ok(Self::Ne),
            "contains" => Ok(Self::Contains),
            "starts_with" => Ok(Self::StartsWith),
            "ends_with" => Ok(Self::EndsWith),
            "empty" => Ok(Self::Empty),
            "gt" => Ok(Self::Gt),
            "lt" => Ok(Self::Lt),
            "gte" => Ok(Self::Gte),
            "lte" => Ok(Self::Lte),
            "regex" => {
                let pattern = value.ok_or("regex condition requires a value")?;
                Regex::new(pattern)
                    .map(Self::Regex)
                    .map_err(|e| format!("invalid regex '{}': {}", pattern, e))
            }
            other => Err(format!("unknown condition: {}", other)),
        }
    }

    /// Whether the operator compares against a value
    pub fn needs_value(&self) -> bool {
        !matches!(self, Self::Empty)
    }
}

/// A single condition on one field
#[derive(Debug, Clone)]
pub struct Condition {
    /// Field the condition reads
    pub field: FieldIndex,
    /// Comparison operator
    pub operator: Operator,
    /// Value to compare against (empty for `Empty`)
    pub value: Bytes,
}

impl Condition {
    /// Create a new condition
    pub fn new(field: FieldIndex, operator: Operator, value: impl Into<Bytes>) -> Self {
        Self {
            field,
            operator,
            value: value.into(),
        }
    }

    /// Create an equals condition
    pub fn eq(field: FieldIndex, value: &'static str) -> Self {
        Self::new(field, Operator::Eq, value)
    }

    /// Create a not-equals condition
    pub fn ne(field: FieldIndex, value: &'static str) -> Self {
        Self::new(field, Operator::Ne, value)
    }

    /// Create a contains condition
    pub fn contains(field: FieldIndex, value: &'static str) -> Self {
        Self::new(field, Operator::Contains, value)
    }

    /// Create a starts_with condition
    pub fn starts_with(field: FieldIndex, value: &'static str) -> Self {
        Self::new(field, Operator::StartsWith, value)
    }

    /// Create an empty condition
    pub fn empty(field: FieldIndex) -> Self {
        Self::new(field, Operator::Empty, Bytes::new())
    }

    /// Create a regex condition
    pub fn regex(field: FieldIndex, pattern: &str) -> Result<Self, String> {
        let operator = Operator::parse("regex", Some(pattern))?;
        Ok(Self::new(
            field,
            operator,
            Bytes::copy_from_slice(pattern.as_bytes()),
        ))
    }

    /// Evaluate against a field value
    #[inline]
    pub fn matches(&self, field: &[u8]) -> bool {
        let value = &self.value[..];
        match &self.operator {
            Operator::Eq => field == value,
            Operator::Ne => field != value,
            Operator::Contains => contains(field, value),
            Operator::StartsWith => field.starts_with(value),
            Operator::EndsWith => field.ends_with(value),
            Operator::Empty => field.is_empty(),
            Operator::Regex(re) => re.is_match(field),
            Operator::Gt => numeric_compare(field, value, |a, b| a > b),
            Operator::Lt => numeric_compare(field, value, |a, b| a < b),
            Operator::Gte => numeric_compare(field, value, |a, b| a >= b),
            Operator::Lte => numeric_compare(field, value, |a, b| a <= b),
        }
    }
}

/// Configuration for the drop filter
#[derive(Debug, Clone, Default)]
pub struct DropConfig {
    /// Action to take when conditions match
    pub action: FilterAction,
    /// How to combine multiple conditions
    pub match_mode: MatchMode,
    /// Conditions to evaluate
    pub conditions: Vec<Condition>,
}

impl DropConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filter action
    pub fn with_action(mut self, action: FilterAction) -> Self {
        self.action = action;
        self
    }

    /// Set the match mode
    pub fn with_match_mode(mut self, mode: MatchMode) -> Self {
        self.match_mode = mode;
        self
    }

    /// Add a condition
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.conditions.is_empty() {
            return Err("at least one condition is required".to_string());
        }
        Ok(())
    }

    /// Decode from filter params, resolving field names
    ///
    /// Accepts a single `field`/`condition`/`value` triple, a `conditions`
    /// array of tables with the same keys, or both.
    pub fn from_params(params: &FilterParams<'_>) -> FilterResult<Self> {
        let mut config = DropConfig::default();

        if let Some(action) = params.str("action") {
            config.action = match action {
                "drop" => FilterAction::Drop,
                "keep" => FilterAction::Keep,
                other => return Err(FilterError::config(format!("unknown action: {}", other))),
            };
        }

        if let Some(mode) = params.str("match") {
            config.match_mode = match mode {
                "all" => MatchMode::All,
                "any" => MatchMode::Any,
                other => {
                    return Err(FilterError::config(format!("unknown match mode: {}", other)));
                }
            };
        }

        if let Some(field) = params.str("field") {
            let condition = build_condition(
                params,
                field,
                params.str("condition"),
                params.str("value"),
            )?;
            config.conditions.push(condition);
        }

        if let Some(conditions) = params.config.options.get("conditions") {
            let array = conditions
                .as_array()
                .ok_or_else(|| FilterError::config("conditions must be an array"))?;
            for value in array {
                let table = value
                    .as_table()
                    .ok_or_else(|| FilterError::config("condition must be a table"))?;
                let field = table
                    .get("field")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| FilterError::config("condition requires 'field'"))?;
                let condition = build_condition(
                    params,
                    field,
                    table.get("condition").and_then(|v| v.as_str()),
                    table.get("value").and_then(|v| v.as_str()),
                )?;
                config.conditions.push(condition);
            }
        }

        config.validate().map_err(FilterError::config)?;
        Ok(config)
    }
}

fn build_condition(
    params: &FilterParams<'_>,
    field: &str,
    operator: Option<&str>,
    value: Option<&str>,
) -> FilterResult<Condition> {
    let index = params.resolve(field)?;
    let operator = Operator::parse(operator.unwrap_or("eq"), value).map_err(FilterError::config)?;

    if operator.needs_value() && value.is_none() {
        return Err(FilterError::config(format!(
            "condition on '{}' requires a value for {:?}",
            field, operator
        )));
    }

    let value = value
        .map(|v| Bytes::copy_from_slice(v.as_bytes()))
        .unwrap_or_default();
    Ok(Condition::new(index, operator, value))
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle)
}

fn numeric_compare(field: &[u8], expected: &[u8], cmp: impl Fn(f64, f64) -> bool) -> bool {
    match (parse_f64(field), parse_f64(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

fn parse_f64(bytes: &[u8]) -> Option<f64> {
    std::str::from_utf8(bytes).ok()?.trim().parse().ok()
}
