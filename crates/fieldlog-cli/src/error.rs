use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldlog_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("No event comment provided")]
    EmptyComment,
    #[error("Event ID cannot be empty")]
    EmptyEventId,
    #[error("Nothing to change: pass at least one field to edit")]
    EmptyEdit,
    #[error("Invalid timestamp '{0}': expected RFC 3339, e.g. 2024-05-02T09:30:00Z")]
    InvalidTimestamp(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error(
        "Sync is not configured. Run `fieldlog config init --api-url <URL>` or set FIELDLOG_API_URL."
    )]
    SyncNotConfigured,
    #[error("Sync aborted: {0}")]
    SyncAborted(String),
}
