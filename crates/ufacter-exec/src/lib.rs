//! ufacter-exec: command execution abstraction
//!
//! Reporters that read their data from system tools (`ip`, `systemd-detect-virt`)
//! go through [`CommandExecutor`] so tests can substitute canned output.

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::LocalExecutor;
pub use result::CommandResult;
pub use traits::CommandExecutor;
