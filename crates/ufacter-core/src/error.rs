//! Core error types for ufacter-core
//!
//! Only engine-level failures live here. A reporter that cannot read its
//! source reports a diagnostics fact instead of returning an error.

use thiserror::Error;

/// Errors that abort a collection run
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Fact queue cannot be created with the requested capacity
    #[error("invalid fact queue capacity: {0}")]
    QueueCapacity(usize),

    /// Every producer went away before all reporters signalled completion
    #[error("fact queue closed after {finished} of {expected} reporters finished")]
    QueueClosed {
        /// Number of reporters started
        expected: usize,
        /// Number of sentinels observed before the queue closed
        finished: usize,
    },

    /// Custom facts file could not be read
    #[error("cannot read custom facts from {path}: {reason}")]
    CustomFactsRead {
        /// File that was requested
        path: String,
        /// Underlying I/O error
        reason: String,
    },

    /// Custom facts file is not a valid YAML mapping
    #[error("invalid custom facts: {0}")]
    CustomFactsParse(String),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl CoreError {
    /// Check if the error comes from operator-supplied input
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            CoreError::CustomFactsRead { .. }
                | CoreError::CustomFactsParse(_)
                | CoreError::ConfigError(_)
                | CoreError::QueueCapacity(_)
        )
    }
}
