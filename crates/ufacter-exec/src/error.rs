//! Error types for ufacter-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running a command
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Command execution failed
    #[error("command execution failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// Command timed out
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Program not installed
    #[error("program not found: {0}")]
    NotFound(String),

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// Output could not be parsed
    #[error("cannot parse command output: {0}")]
    ParseError(String),
}

impl ExecError {
    /// Check if the program is simply missing on this host
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ExecError::NotFound(_))
    }
}
