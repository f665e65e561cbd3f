// Error handling module
// Defines the error taxonomy surfaced by the transport

use thiserror::Error;

use crate::problem::ProblemError;

/// Errors that can occur while dispatching a request
#[derive(Error, Debug)]
pub enum ApiError {
    /// The auth endpoint rejected the API key (or none was configured)
    #[error("Authentication failed: {message}")]
    AuthError { status: Option<u16>, message: String },

    /// Failure response carrying an `application/problem+json` body
    #[error(transparent)]
    Problem(#[from] ProblemError),

    /// Network or protocol failure, including non-problem error statuses
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Auth response body could not be deserialized
    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    /// File-backed body source could not be opened
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Request validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// HTTP status associated with the failure, when one is known
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::AuthError { status, .. } => *status,
            ApiError::Problem(problem) => Some(problem.status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Structured problem payload, if this is a classified API error
    pub fn problem(&self) -> Option<&ProblemError> {
        match self {
            ApiError::Problem(problem) => Some(problem),
            _ => None,
        }
    }
}

/// Result type alias for transport operations
pub type Result<T> = std::result::Result<T, ApiError>;
