//! Error types for ufacter-facts

use thiserror::Error;

/// Errors raised while selecting reporters or reading host sources
///
/// Reporters turn these into diagnostics facts; only
/// [`FactsError::UnknownModule`] ever reaches the caller.
#[derive(Error, Debug, Clone)]
pub enum FactsError {
    /// Module name not known
    #[error("unknown module: {0}")]
    UnknownModule(String),

    /// Source file could not be read
    #[error("cannot read {path}: {reason}")]
    ReadError {
        /// File or directory that failed
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// Source content could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid address or prefix length
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}
