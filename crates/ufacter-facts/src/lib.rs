//! ufacter-facts: fact reporters for Linux hosts
//!
//! One [`Reporter`](ufacter_core::Reporter) per module. Reporters read
//! procfs, sysfs and `/etc` below [`HostPaths`], query `sysinfo`, and run
//! `ip` and `systemd-detect-virt` through a
//! [`CommandExecutor`](ufacter_exec::CommandExecutor).

pub mod about;
pub mod cpu;
pub mod disk;
pub mod error;
pub mod host;
pub mod iproute;
pub mod link;
pub mod mem;
pub mod net;
pub mod paths;
pub mod registry;
pub mod route;
pub mod units;

#[cfg(test)]
mod test_support;

pub use error::FactsError;
pub use paths::HostPaths;
pub use registry::{Module, build};
