//! Host error types.

use doodlefest_core::error::DomainError;
use serde::Serialize;
use thiserror::Error;

/// Startup and runtime errors for the host binary.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Reading stdin or writing stdout failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A reply or event could not be encoded.
    #[error("encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The hosted session could not be created or removed.
    #[error("session error: {0}")]
    Domain(#[from] DomainError),

    /// A background task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// JSON body returned for rejected requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Whether the rejection is a soft warning the player can ignore.
    pub soft: bool,
}

impl From<&DomainError> for ErrorBody {
    fn from(err: &DomainError) -> Self {
        Self {
            error: err.code(),
            message: err.to_string(),
            soft: err.is_soft_warning(),
        }
    }
}

impl ErrorBody {
    /// A body for a request line that could not be decoded.
    #[must_use]
    pub fn malformed_request(detail: &str) -> Self {
        Self {
            error: "malformed_request",
            message: format!("request could not be decoded: {detail}"),
            soft: false,
        }
    }
}
