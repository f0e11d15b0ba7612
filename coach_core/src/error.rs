//! Error types for the coach_core library.
//!
//! Internally every operation returns [`Result`]. At the outer boundary
//! (CLI, or any other front end) errors are flattened into an
//! [`ActionError`] carrying a short message that is safe to show a user.

use serde::{Deserialize, Serialize};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for coach_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Caller has no identity, or the wrong role, for a mutating operation
    #[error("unauthorized")]
    Unauthorized,

    /// Referenced entity is missing or not owned by the caller
    #[error("{0} not found")]
    NotFound(String),

    /// Operation clashes with the current state (e.g. a session already running)
    #[error("{0}")]
    Conflict(String),

    /// Input rejected before touching the store
    #[error("{0}")]
    Validation(String),

    /// Row-level rule rejected by the store (ownership, foreign key)
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// Store state management error
    #[error("State error: {0}")]
    State(String),
}

impl Error {
    /// Message suitable for an end user.
    ///
    /// Internal failures are reported generically; their detail only goes to
    /// the log.
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthorized => "unauthorized".to_string(),
            Error::NotFound(_) | Error::Conflict(_) | Error::Validation(_) => self.to_string(),
            Error::Config(_) => self.to_string(),
            _ => "operation failed".to_string(),
        }
    }
}

/// Failure reported across the operation boundary: `{"error": "..."}`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActionError {
    pub error: String,
}

impl std::fmt::Display for ActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.error)
    }
}

impl std::error::Error for ActionError {}

impl From<Error> for ActionError {
    fn from(e: Error) -> Self {
        match &e {
            Error::NotFound(_)
            | Error::Conflict(_)
            | Error::Validation(_)
            | Error::Unauthorized => {
                tracing::debug!("Operation rejected: {}", e);
            }
            _ => {
                tracing::error!("Operation failed: {}", e);
            }
        }
        ActionError {
            error: e.user_message(),
        }
    }
}

/// Convert an internal result into the fail-soft boundary result
pub fn into_action<T>(result: Result<T>) -> std::result::Result<T, ActionError> {
    result.map_err(ActionError::from)
}
