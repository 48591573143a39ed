//! Error types for wire and snapshot encoding.

use thiserror::Error;

/// Errors that can occur while encoding or decoding.
#[derive(Error, Debug, Clone)]
pub enum WireError {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Snapshot has no text field")]
    MissingText,
}

impl From<serde_json::Error> for WireError {
    fn from(err: serde_json::Error) -> Self {
        WireError::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WireError>;
