//! Record layout and validation configuration
//!
//! # Example
//!
//! ```toml
//! [record]
//! separator = "|"
//! max_fields = 16
//! fields = ["ts", "host", "level", "message"]
//!
//! [validation]
//! required_fields = ["ts", "message"]
//! ```

use serde::Deserialize;
use sluice_record::{DEFAULT_MAX_FIELDS, DEFAULT_SEPARATOR};

/// Field separator byte
///
/// Accepts either a single ASCII character (`separator = ","`) or a byte
/// value (`separator = 30`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "SeparatorRepr")]
pub struct Separator(u8);

impl Separator {
    /// Byte value of the separator
    pub fn byte(self) -> u8 {
        self.0
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self(DEFAULT_SEPARATOR)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SeparatorRepr {
    Byte(i64),
    Char(String),
}

impl TryFrom<SeparatorRepr> for Separator {
    type Error = String;

    fn try_from(repr: SeparatorRepr) -> Result<Self, Self::Error> {
        let byte = match repr {
            SeparatorRepr::Byte(value) => u8::try_from(value)
                .map_err(|_| format!("separator byte {value} is out of range"))?,
            SeparatorRepr::Char(s) => {
                let bytes = s.as_bytes();
                if bytes.len() != 1 {
                    return Err(format!(
                        "separator must be a single ASCII character, got {s:?}"
                    ));
                }
                bytes[0]
            }
        };

        if byte == b'\n' || byte == b'\r' {
            return Err("separator cannot be a line terminator".to_string());
        }
        Ok(Self(byte))
    }
}

/// Record layout configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RecordConfig {
    /// Field separator
    /// Default: 0x1E
    pub separator: Separator,

    /// Maximum number of fields per record
    /// Default: 64
    pub max_fields: usize,

    /// Ordered field names; position is the field index
    pub fields: Vec<String>,
}

impl Default for RecordConfig {
    fn default() -> Self {
        Self {
            separator: Separator::default(),
            max_fields: DEFAULT_MAX_FIELDS,
            fields: Vec::new(),
        }
    }
}

impl RecordConfig {
    /// Check if a field name is declared
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}

/// Record validation configuration
///
/// Records failing validation are counted against the first offending field
/// and never reach the filter chain.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Fields that must be present and non-empty
    pub required_fields: Vec<String>,
}

impl ValidationConfig {
    /// Whether any validation rule is configured
    pub fn is_enabled(&self) -> bool {
        !self.required_fields.is_empty()
    }
}
