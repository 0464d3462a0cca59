//! Configuration for a collection run

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::custom::CustomFactsOrder;
use crate::engine::{CollectionEngine, DEFAULT_QUEUE_CAPACITY};
use crate::error::CoreError;
use crate::reporter::ReportOptions;

/// Settings of the collection engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    /// Report facts that change between invocations
    #[serde(default = "default_true")]
    pub include_volatile: bool,
    /// Report facts the legacy facter tool does not know about
    #[serde(default = "default_true")]
    pub include_extended: bool,
    /// Capacity of the shared fact queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Per-reporter timeout in seconds, 0 disables it
    #[serde(default = "default_reporter_timeout")]
    pub reporter_timeout_secs: u64,
    /// YAML file with operator-supplied facts
    #[serde(default)]
    pub custom_facts: Option<PathBuf>,
    /// Merge custom facts before or after reporter facts
    #[serde(default)]
    pub custom_facts_order: CustomFactsOrder,
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_reporter_timeout() -> u64 {
    60
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            include_volatile: true,
            include_extended: true,
            queue_capacity: default_queue_capacity(),
            reporter_timeout_secs: default_reporter_timeout(),
            custom_facts: None,
            custom_facts_order: CustomFactsOrder::default(),
        }
    }
}

impl CollectionConfig {
    /// Options handed to every reporter
    #[must_use]
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            include_volatile: self.include_volatile,
            include_extended: self.include_extended,
        }
    }

    /// Per-reporter timeout, `None` when disabled
    #[must_use]
    pub fn reporter_timeout(&self) -> Option<Duration> {
        (self.reporter_timeout_secs > 0).then(|| Duration::from_secs(self.reporter_timeout_secs))
    }

    /// Check the settings for values the engine cannot work with
    ///
    /// # Errors
    /// Returns an error if the queue capacity is zero.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.queue_capacity == 0 {
            return Err(CoreError::ConfigError(
                "queue_capacity must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Build an engine from these settings
    ///
    /// # Errors
    /// Returns an error if the settings are invalid.
    pub fn engine(&self) -> Result<CollectionEngine, CoreError> {
        self.validate()?;
        Ok(CollectionEngine::new(self.report_options())
            .with_queue_capacity(self.queue_capacity)
            .with_reporter_timeout(self.reporter_timeout()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CollectionConfig::default();

        assert_eq!(config.report_options(), ReportOptions::default());
        assert_eq!(config.reporter_timeout(), Some(Duration::from_secs(60)));
        assert!(config.engine().is_ok());
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = CollectionConfig {
            reporter_timeout_secs: 0,
            ..CollectionConfig::default()
        };
        assert_eq!(config.reporter_timeout(), None);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = CollectionConfig {
            queue_capacity: 0,
            ..CollectionConfig::default()
        };
        assert!(matches!(config.engine(), Err(CoreError::ConfigError(_))));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: CollectionConfig = serde_json::from_str(
            r#"{"include_volatile": false, "custom_facts_order": "after_reporters"}"#,
        )
        .unwrap();

        assert!(!config.include_volatile);
        assert!(config.include_extended);
        assert_eq!(config.queue_capacity, 1024);
        assert_eq!(config.custom_facts_order, CustomFactsOrder::AfterReporters);
    }
}
