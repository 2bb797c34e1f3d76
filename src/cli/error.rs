//! CLI-specific error types

use crate::config::ConfigError;
use crate::metadata::MetadataError;
use crate::records::RecordError;
use crate::store::StoreError;
use thiserror::Error;

/// CLI-specific error type
#[derive(Error, Debug)]
pub enum CliError {
    #[error("No connection configured for catalog {0}. Pass --root or set default_connection.")]
    NoConnection(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    #[error("Scan error: {0}")]
    Record(#[from] RecordError),

    #[error("IO error: {0}")]
    IoError(String),
}
