//! Error types for Runebook

use thiserror::Error;

/// Result type for Runebook operations
pub type Result<T> = std::result::Result<T, RunebookError>;

/// Runebook error types
#[derive(Error, Debug)]
pub enum RunebookError {
    /// A scope's command document could not be decoded
    #[error("Decode error in scope '{scope}': {message}")]
    Decode { scope: String, message: String },

    /// The compose loader rejected a (synthesized) compose document
    #[error("Service load error: {0}")]
    ServiceLoad(String),

    #[error("Command '{0}' is marked disabled")]
    CommandDisabled(String),

    #[error("No service definition was correlated for command '{0}'")]
    MissingService(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    /// Any failure reported by the container engine client
    #[error("Engine error: {0}")]
    Engine(String),

    #[error("Stack error: {0}")]
    Stack(String),

    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Lock error: {0}")]
    Lock(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunebookError {
    /// Build a decode error for a scope
    pub fn decode(scope: &str, message: impl std::fmt::Display) -> Self {
        RunebookError::Decode {
            scope: scope.to_string(),
            message: message.to_string(),
        }
    }

    /// Build a service load error from anything printable
    pub fn service_load(message: impl std::fmt::Display) -> Self {
        RunebookError::ServiceLoad(message.to_string())
    }
}
