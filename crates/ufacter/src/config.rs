//! Configuration file loading and types

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use ufacter_core::CollectionConfig;
use ufacter_facts::Module;
use ufacter_format::Format;

/// Top-level contents of `ufacter.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Modules to run, all of them when unset
    #[serde(default)]
    pub modules: Option<Vec<Module>>,
    /// Output format
    #[serde(default)]
    pub format: Format,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
    /// Engine settings
    #[serde(default)]
    pub collection: CollectionConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            modules: None,
            format: Format::default(),
            log_level: default_log_level(),
            log_json: false,
            collection: CollectionConfig::default(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("invalid configuration in {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load from the first default location that exists
    ///
    /// Returns the path the configuration came from, `None` for built-in
    /// defaults.
    ///
    /// # Errors
    /// Returns error if a found file cannot be read or parsed
    pub fn load_default() -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Ok(path) = std::env::var("UFACTER_CONFIG") {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        let mut candidates = vec![
            PathBuf::from("ufacter.toml"),
            PathBuf::from("/etc/ufacter/ufacter.toml"),
        ];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join("ufacter/ufacter.toml"));
        }

        for path in candidates {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    /// Modules to run
    ///
    /// An explicitly empty list selects nothing.
    #[must_use]
    pub fn selected_modules(&self) -> Vec<Module> {
        self.modules
            .clone()
            .unwrap_or_else(|| Module::ALL.to_vec())
    }
}
