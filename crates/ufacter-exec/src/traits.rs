//! Command executor trait

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::ExecError;
use crate::result::CommandResult;

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run a program with arguments, without a shell
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandResult, ExecError>;

    /// Run a program, giving up after `timeout`
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;

    /// Short name of the executor, for logging
    fn executor_type(&self) -> &'static str;
}

/// Run a command that prints JSON and deserialize its output
///
/// # Errors
/// Returns an error if the command cannot run, exceeds `timeout`, exits
/// unsuccessfully, or its output does not deserialize into `T`.
pub async fn run_json<T: DeserializeOwned>(
    executor: &dyn CommandExecutor,
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<T, ExecError> {
    let result = executor.run_with_timeout(program, args, timeout).await?;
    if !result.success() {
        return Err(ExecError::CommandFailed {
            status: result.status,
            stderr: result.stderr.trim().to_string(),
        });
    }
    serde_json::from_str(&result.stdout).map_err(|e| ExecError::ParseError(e.to_string()))
}
