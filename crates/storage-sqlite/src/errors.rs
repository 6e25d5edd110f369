//! Error types for the sqlite storage crate.

use nocturne_core::SyncError;
use thiserror::Error;

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur in the sqlite store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Diesel(#[from] diesel::result::Error),

    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("migration error: {0}")]
    Migration(String),

    #[error("write actor unavailable: {0}")]
    WriterClosed(String),

    #[error("payload serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StorageError {
    pub fn pool(message: impl Into<String>) -> Self {
        Self::Pool(message.into())
    }

    pub fn migration(message: impl Into<String>) -> Self {
        Self::Migration(message.into())
    }

    pub fn writer_closed(message: impl Into<String>) -> Self {
        Self::WriterClosed(message.into())
    }
}

impl From<StorageError> for SyncError {
    fn from(err: StorageError) -> Self {
        SyncError::store(err.to_string())
    }
}
