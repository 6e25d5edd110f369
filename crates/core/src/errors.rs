//! Error types shared across the sync engine and its capability traits.

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Retry policy class for sync failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
}

/// Errors that can occur while synchronizing records.
#[derive(Debug, Error)]
pub enum SyncError {
    /// No connectivity. The change has been queued locally, not lost.
    #[error("offline: change queued for the next online pass")]
    Offline,

    /// Record failed domain invariants and was never transmitted.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An expected remote document is absent.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Remote payload is missing required fields or has the wrong shape.
    #[error("failed to decode {collection}/{id}: {reason}")]
    Decode {
        collection: String,
        id: String,
        reason: String,
    },

    /// Transport-level failure, distinct from validation.
    #[error("network error: {0}")]
    Network(String),

    /// Local store failure.
    #[error("local store error: {0}")]
    Store(String),
}

impl SyncError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Create a local store error.
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    pub fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    pub fn decode(collection: &str, id: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            collection: collection.to_string(),
            id: id.to_string(),
            reason: reason.into(),
        }
    }

    /// Classify the error for retry policy. Transient failures leave records
    /// queued for the next pass; permanent ones park them in `Error` status.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Offline | Self::Network(_) | Self::Store(_) => RetryClass::Retryable,
            Self::Validation(_) | Self::NotFound { .. } | Self::Decode { .. } => {
                RetryClass::Permanent
            }
        }
    }

    pub fn is_transient(&self) -> bool {
        self.retry_class() == RetryClass::Retryable
    }
}
