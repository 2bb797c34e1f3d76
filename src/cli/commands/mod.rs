//! CLI command implementations

pub mod catalog;
pub mod infer;
pub mod scan;

use crate::cli::error::CliError;
use crate::config::ConnectorConfig;
use crate::store::{ConnectionCache, DocumentStore, JsonLinesStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Catalog used when none is given on the command line
pub const DEFAULT_CATALOG: &str = "default";

/// Arguments shared by every command
#[derive(Debug, Clone)]
pub struct ConnectArgs {
    /// Store root; overrides the configured connection
    pub root: Option<String>,
    /// Catalog whose connection string is looked up in the configuration
    pub catalog: String,
    /// Directory holding `.docstore.toml`
    pub config_dir: PathBuf,
}

impl ConnectArgs {
    /// Configuration from `config_dir` with environment overrides applied.
    pub fn load_config(&self) -> Result<ConnectorConfig, CliError> {
        Ok(ConnectorConfig::load(&self.config_dir)?)
    }

    /// Connection string: `--root`, else the catalog entry, else the default.
    pub fn connection_string(&self, config: &ConnectorConfig) -> Result<String, CliError> {
        match &self.root {
            Some(root) => Ok(root.clone()),
            None => config
                .connection_string(&self.catalog)
                .map(str::to_string)
                .ok_or_else(|| CliError::NoConnection(self.catalog.clone())),
        }
    }

    /// Open the store behind the resolved connection string.
    pub fn connect(&self, config: &ConnectorConfig) -> Result<Arc<dyn DocumentStore>, CliError> {
        let connection_string = self.connection_string(config)?;
        let cache = ConnectionCache::new(|s| {
            JsonLinesStore::from_connection_string(s)
                .map(|store| Arc::new(store) as Arc<dyn DocumentStore>)
        });
        Ok(cache.get_or_create(&connection_string)?)
    }
}

/// Pretty-print a serializable value as JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::IoError(format!("Failed to serialize output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(root: Option<&str>) -> ConnectArgs {
        ConnectArgs {
            root: root.map(str::to_string),
            catalog: DEFAULT_CATALOG.to_string(),
            config_dir: PathBuf::from("."),
        }
    }

    #[test]
    fn test_root_overrides_config() {
        let mut config = ConnectorConfig::new();
        config.default_connection = Some("/configured".to_string());
        assert_eq!(
            args(Some("/cli")).connection_string(&config).unwrap(),
            "/cli"
        );
        assert_eq!(
            args(None).connection_string(&config).unwrap(),
            "/configured"
        );
    }

    #[test]
    fn test_missing_connection() {
        let config = ConnectorConfig::new();
        assert!(matches!(
            args(None).connection_string(&config),
            Err(CliError::NoConnection(_))
        ));
    }
}
