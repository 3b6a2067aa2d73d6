//! Source configuration types
//!
//! A topology reads from exactly one source. The source type is selected
//! with the `type` key.

use serde::Deserialize;
use std::path::PathBuf;

/// Default bytes read per batch
pub const DEFAULT_BATCH_BYTES: usize = 256 * 1024;

/// Default number of recycled batch buffers
pub const DEFAULT_BUFFER_POOL: usize = 16;

/// Configuration for the topology source
///
/// # Example
///
/// ```toml
/// [source]
/// type = "file"
/// path = "/var/log/app.log"
/// batch_bytes = 65536
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Read newline-delimited records from standard input
    Stdin(StdinSourceConfig),

    /// Read newline-delimited records from a file
    File(FileSourceConfig),
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self::Stdin(StdinSourceConfig::default())
    }
}

impl SourceConfig {
    /// Get the source type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Stdin(_) => "stdin",
            Self::File(_) => "file",
        }
    }

    /// Bytes read per batch
    pub fn batch_bytes(&self) -> usize {
        match self {
            Self::Stdin(c) => c.batch_bytes,
            Self::File(c) => c.batch_bytes,
        }
    }

    /// Number of batch buffers kept for reuse
    pub fn buffer_pool(&self) -> usize {
        match self {
            Self::Stdin(c) => c.buffer_pool,
            Self::File(c) => c.buffer_pool,
        }
    }
}

/// Stdin source configuration
///
/// # Example
///
/// ```toml
/// [source]
/// type = "stdin"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StdinSourceConfig {
    /// Target size of each batch in bytes
    /// Default: 262144 (256KB)
    pub batch_bytes: usize,

    /// Number of batch buffers kept for reuse
    /// Default: 16
    pub buffer_pool: usize,
}

impl Default for StdinSourceConfig {
    fn default() -> Self {
        Self {
            batch_bytes: DEFAULT_BATCH_BYTES,
            buffer_pool: DEFAULT_BUFFER_POOL,
        }
    }
}

/// File source configuration
///
/// The file path and modification time are attached to every batch as
/// `source.path` and `source.mtime` metadata.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FileSourceConfig {
    /// File to read (required)
    pub path: PathBuf,

    /// Target size of each batch in bytes
    /// Default: 262144 (256KB)
    pub batch_bytes: usize,

    /// Number of batch buffers kept for reuse
    /// Default: 16
    pub buffer_pool: usize,
}

impl Default for FileSourceConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            batch_bytes: DEFAULT_BATCH_BYTES,
            buffer_pool: DEFAULT_BUFFER_POOL,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_stdin() {
        let config = SourceConfig::default();
        assert_eq!(config.type_name(), "stdin");
        assert_eq!(config.batch_bytes(), DEFAULT_BATCH_BYTES);
        assert_eq!(config.buffer_pool(), DEFAULT_BUFFER_POOL);
    }

    #[test]
    fn test_deserialize_file() {
        let toml = r#"
type = "file"
path = "/tmp/input.log"
batch_bytes = 4096
"#;
        let config: SourceConfig = toml::from_str(toml).unwrap();
        match config {
            SourceConfig::File(ref file) => {
                assert_eq!(file.path, PathBuf::from("/tmp/input.log"));
                assert_eq!(file.batch_bytes, 4096);
                assert_eq!(file.buffer_pool, DEFAULT_BUFFER_POOL);
            }
            _ => panic!("expected file source"),
        }
        assert_eq!(config.type_name(), "file");
    }

    #[test]
    fn test_deserialize_stdin() {
        let config: SourceConfig = toml::from_str(r#"type = "stdin""#).unwrap();
        assert_eq!(config.type_name(), "stdin");
    }

    #[test]
    fn test_unknown_type_rejected() {
        assert!(toml::from_str::<SourceConfig>(r#"type = "kafka""#).is_err());
    }
}
