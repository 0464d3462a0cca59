//! Host filesystem roots
//!
//! When ufacter runs inside a container the host's `/etc`, `/sys` and
//! `/proc` are usually mounted elsewhere. `HOST_ETC`, `HOST_SYS` and
//! `HOST_PROC` point the reporters at them.

use std::path::{Path, PathBuf};

use crate::error::FactsError;

/// Locations of the host's configuration, sysfs and procfs trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPaths {
    /// Configuration directory, `/etc` by default
    pub etc: PathBuf,
    /// sysfs mount, `/sys` by default
    pub sys: PathBuf,
    /// procfs mount, `/proc` by default
    pub proc: PathBuf,
}

impl HostPaths {
    /// Read the roots from the process environment
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve the roots through `lookup`, falling back to the defaults
    /// for unset or empty variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let resolve = |key: &str, default: &str| {
            lookup(key)
                .filter(|value| !value.is_empty())
                .map_or_else(|| PathBuf::from(default), PathBuf::from)
        };
        Self {
            etc: resolve("HOST_ETC", "/etc"),
            sys: resolve("HOST_SYS", "/sys"),
            proc: resolve("HOST_PROC", "/proc"),
        }
    }

    /// Roots below a single directory, used for fixtures
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            etc: root.join("etc"),
            sys: root.join("sys"),
            proc: root.join("proc"),
        }
    }
}

impl Default for HostPaths {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

/// Read a whole text file
///
/// # Errors
/// Returns [`FactsError::ReadError`] naming the file on failure.
pub async fn read_to_string(path: &Path) -> Result<String, FactsError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FactsError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
}

/// Read a sysfs attribute, `None` if it does not exist
///
/// # Errors
/// Returns [`FactsError::ReadError`] if the file exists but cannot be read.
pub async fn read_attribute(path: &Path) -> Result<Option<String>, FactsError> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content.trim().to_string())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(FactsError::ReadError {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}
