//! Error types for Vellum.

use thiserror::Error;

/// Result type alias using VellumError.
pub type Result<T> = std::result::Result<T, VellumError>;

/// Errors that can occur in Vellum operations.
#[derive(Debug, Error)]
pub enum VellumError {
    // Handle errors
    #[error("handle is not owned by any document")]
    UnownedHandle,

    #[error("handle belongs to a different document")]
    ForeignHandle,

    // Tree errors
    #[error("number tree is damaged: {0}")]
    Structural(String),

    #[error("key not found: {0}")]
    KeyNotFound(i64),

    // Configuration errors
    #[error("invalid configuration: {name} = {value}")]
    InvalidConfig { name: String, value: String },

    // Internal errors
    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),
}
