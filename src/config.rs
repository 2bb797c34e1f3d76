//! Connector configuration file support
//!
//! Handles parsing of `.docstore.toml` configuration files and
//! environment variable overrides.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::inference::DEFAULT_SAMPLE_SIZE;

/// Default configuration filename
pub const CONFIG_FILENAME: &str = ".docstore.toml";

/// Default number of documents fetched per round trip during scans
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Environment variable for the multi-tenant collection patterns
pub const ENV_GLOB_PATTERN: &str = "GLOB_PATTERN";

/// Environment variable for the inference sample size
pub const ENV_SAMPLE_SIZE: &str = "SCHEMA_INFERENCE_NUM_DOCS";

/// Environment variable for the scan batch size
pub const ENV_BATCH_SIZE: &str = "MONGO_QUERY_BATCH_SIZE";

/// Environment variable disabling projection and case-insensitive field lookup
pub const ENV_DISABLE_PROJECTION_AND_CASING: &str = "disable_projection_and_casing";

/// Environment variable for the fallback connection string
pub const ENV_DEFAULT_CONNECTION: &str = "default_docdb";

/// Error type for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be parsed
    #[error("Config error: {0}")]
    Parse(String),

    /// The configuration could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(String),
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Connector configuration
///
/// Represents the `.docstore.toml` configuration file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// `;`-separated collection patterns with `{{name}}` placeholders
    #[serde(default)]
    pub glob_pattern: String,

    /// Documents sampled per table during schema inference
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,

    /// Documents fetched per round trip during scans
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Turn off scan projection and case-insensitive field lookup
    #[serde(default)]
    pub disable_projection_and_casing: bool,

    /// Connection string used when a catalog has no entry of its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_connection: Option<String>,

    /// Connection string per catalog
    #[serde(default)]
    pub catalogs: BTreeMap<String, String>,
}

fn default_sample_size() -> usize {
    DEFAULT_SAMPLE_SIZE
}

fn default_batch_size() -> usize {
    DEFAULT_BATCH_SIZE
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            glob_pattern: String::new(),
            sample_size: default_sample_size(),
            batch_size: default_batch_size(),
            disable_projection_and_casing: false,
            default_connection: None,
            catalogs: BTreeMap::new(),
        }
    }
}

impl ConnectorConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a directory
    ///
    /// Looks for `.docstore.toml` in the directory.
    /// Falls back to defaults if not found.
    pub fn load(dir: &Path) -> ConfigResult<Self> {
        let config_path = dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(format!("Failed to read config: {}", e)))?;

            Self::parse(&content)?
        } else {
            Self::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    /// Parse configuration from TOML string
    pub fn parse(content: &str) -> ConfigResult<Self> {
        toml::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("Failed to parse config: {}", e)))
    }

    /// Save configuration to a directory
    pub fn save(&self, dir: &Path) -> ConfigResult<()> {
        let content = self.to_toml()?;
        std::fs::write(dir.join(CONFIG_FILENAME), content)
            .map_err(|e| ConfigError::IoError(format!("Failed to write config: {}", e)))
    }

    /// Convert configuration to TOML string
    pub fn to_toml(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self).map_err(|e| {
            ConfigError::Serialization(format!("Failed to serialize config: {}", e))
        })
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(&mut self) {
        let vars = [
            ENV_GLOB_PATTERN,
            ENV_SAMPLE_SIZE,
            ENV_BATCH_SIZE,
            ENV_DISABLE_PROJECTION_AND_CASING,
            ENV_DEFAULT_CONNECTION,
        ];
        self.apply_overrides(
            vars.into_iter()
                .filter_map(|key| std::env::var(key).ok().map(|value| (key, value))),
        );
    }

    /// Apply `(variable, value)` overrides. Unknown keys and unparseable
    /// numbers are ignored.
    pub fn apply_overrides<K, V>(&mut self, overrides: impl IntoIterator<Item = (K, V)>)
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in overrides {
            let value = value.as_ref();
            match key.as_ref() {
                ENV_GLOB_PATTERN => self.glob_pattern = value.to_string(),
                ENV_SAMPLE_SIZE => {
                    if let Ok(size) = value.trim().parse() {
                        self.sample_size = size;
                    }
                }
                ENV_BATCH_SIZE => {
                    if let Ok(size) = value.trim().parse() {
                        self.batch_size = size;
                    }
                }
                ENV_DISABLE_PROJECTION_AND_CASING => {
                    self.disable_projection_and_casing = value.trim().eq_ignore_ascii_case("true");
                }
                ENV_DEFAULT_CONNECTION => self.default_connection = Some(value.to_string()),
                _ => {}
            }
        }
    }

    /// Connection string for a catalog, falling back to the default connection
    pub fn connection_string(&self, catalog: &str) -> Option<&str> {
        self.catalogs
            .get(catalog)
            .or(self.default_connection.as_ref())
            .map(String::as_str)
    }

    /// Check if configuration exists in a directory
    pub fn exists(dir: &Path) -> bool {
        dir.join(CONFIG_FILENAME).exists()
    }
}

/// Generate a sample configuration file content
pub fn sample_config() -> &'static str {
    r#"# Document store connector configuration

# Multi-tenant collection patterns, separated by ';'.
# Each {{name}} placeholder becomes a string column on the logical table.
glob_pattern = "orders_{{tenant}}"

# Documents sampled per table when inferring a schema
sample_size = 10

# Documents fetched per round trip during scans
batch_size = 100

# Disable scan projection and case-insensitive field lookup
disable_projection_and_casing = false

# Connection used when a catalog has no entry below
# default_connection = "/var/lib/docstore"

[catalogs]
# analytics = "/var/lib/docstore/analytics"
"#
}
