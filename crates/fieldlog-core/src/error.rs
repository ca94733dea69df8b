//! Error types for fieldlog-core

use thiserror::Error;

use crate::kv::StoreError;

/// Result type alias using fieldlog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in fieldlog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Key-value backend error
    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Event not found
    #[error("Event not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid client configuration
    #[error("Configuration error: {0}")]
    Config(String),
}
