//! Error types for the HTTP remote store.

use nocturne_core::SyncError;
use thiserror::Error;

/// Result type alias for HTTP remote store operations.
pub type Result<T> = std::result::Result<T, RemoteHttpError>;

/// Retry policy class for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiRetryClass {
    Retryable,
    Permanent,
}

/// Errors that can occur while talking to the document API.
#[derive(Debug, Error)]
pub enum RemoteHttpError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API error response from the document service
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Invalid request (malformed base URL, bad header value, etc.)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl RemoteHttpError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> ApiRetryClass {
        match self {
            Self::Api { status, .. } => match *status {
                408 | 429 | 500..=599 => ApiRetryClass::Retryable,
                _ => ApiRetryClass::Permanent,
            },
            Self::Http(_) => ApiRetryClass::Retryable,
            Self::Json(_) => ApiRetryClass::Permanent,
            Self::InvalidRequest(_) => ApiRetryClass::Permanent,
        }
    }
}

impl From<RemoteHttpError> for SyncError {
    fn from(err: RemoteHttpError) -> Self {
        SyncError::network(err.to_string())
    }
}
