//! Error types for ufacter-format

use thiserror::Error;

/// Errors raised while rendering
#[derive(Error, Debug, Clone)]
pub enum FormatError {
    /// Namespace could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(String),

    /// Output sink refused the write
    #[error("write failed: {0}")]
    Write(String),

    /// Format name not known
    #[error("unknown format: {0} (expected json, yaml, flat or plaintext)")]
    UnknownFormat(String),
}

impl From<std::io::Error> for FormatError {
    fn from(e: std::io::Error) -> Self {
        FormatError::Write(e.to_string())
    }
}
