//! Error types for remind-core

use thiserror::Error;

use crate::codec::CodecError;

/// Result type alias using remind-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in remind-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reminder not found
    #[error("Reminder not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Wire payload could not be decoded
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
}
