//! Planner configuration.

use crate::context::HealthGate;
use crate::errors::DeployflowError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the deploy-strategy planner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannerConfig {
    /// Minimum healthy-instance percentage the WaitHealthy gate requires.
    #[serde(default = "default_min_healthy_percent")]
    pub min_healthy_percent: u8,
    /// Health-check timeout in seconds.
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_seconds: u64,
    /// Strategy key used when a request names none.
    #[serde(default = "default_strategy")]
    pub default_strategy: String,
    /// Whether the planner emits `flow.*` events.
    #[serde(default = "default_emit_events")]
    pub emit_events: bool,
}

fn default_min_healthy_percent() -> u8 {
    100
}

fn default_health_check_timeout() -> u64 {
    1800
}

fn default_strategy() -> String {
    "none".to_string()
}

fn default_emit_events() -> bool {
    true
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            min_healthy_percent: default_min_healthy_percent(),
            health_check_timeout_seconds: default_health_check_timeout(),
            default_strategy: default_strategy(),
            emit_events: default_emit_events(),
        }
    }
}

impl PlannerConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the minimum healthy percentage.
    #[must_use]
    pub fn with_min_healthy_percent(mut self, percent: u8) -> Self {
        self.min_healthy_percent = percent;
        self
    }

    /// Sets the health-check timeout.
    #[must_use]
    pub fn with_health_check_timeout_seconds(mut self, seconds: u64) -> Self {
        self.health_check_timeout_seconds = seconds;
        self
    }

    /// Sets the default strategy key.
    #[must_use]
    pub fn with_default_strategy(mut self, key: impl Into<String>) -> Self {
        self.default_strategy = key.into();
        self
    }

    /// Enables or disables event emission.
    #[must_use]
    pub fn with_emit_events(mut self, emit: bool) -> Self {
        self.emit_events = emit;
        self
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails [`Self::validate`].
    pub fn from_json_str(json: &str) -> Result<Self, DeployflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or its contents are invalid.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, DeployflowError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the healthy percentage is outside `1..=100` or the
    /// health-check timeout is zero.
    pub fn validate(&self) -> Result<(), DeployflowError> {
        if !(1..=100).contains(&self.min_healthy_percent) {
            return Err(DeployflowError::Config(format!(
                "minHealthyPercent must be between 1 and 100, got {}",
                self.min_healthy_percent
            )));
        }
        if self.health_check_timeout_seconds == 0 {
            return Err(DeployflowError::Config(
                "healthCheckTimeoutSeconds must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the health gate composers attach to WaitHealthy.
    #[must_use]
    pub fn health_gate(&self) -> HealthGate {
        HealthGate {
            min_healthy_percent: self.min_healthy_percent,
            timeout: Duration::from_secs(self.health_check_timeout_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PlannerConfig::default();
        assert_eq!(config.min_healthy_percent, 100);
        assert_eq!(config.health_check_timeout_seconds, 1800);
        assert_eq!(config.default_strategy, "none");
        assert!(config.emit_events);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlannerConfig::from_json_str(r#"{"defaultStrategy": "redblack"}"#).unwrap();
        assert_eq!(config.default_strategy, "redblack");
        assert_eq!(config.min_healthy_percent, 100);
    }

    #[test]
    fn test_invalid_percent_rejected() {
        let err = PlannerConfig::from_json_str(r#"{"minHealthyPercent": 0}"#).unwrap_err();
        assert!(matches!(err, DeployflowError::Config(_)));

        let config = PlannerConfig::default().with_min_healthy_percent(101);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let config = PlannerConfig::default().with_health_check_timeout_seconds(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let err = PlannerConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, DeployflowError::Serialization(_)));
    }

    #[test]
    fn test_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"minHealthyPercent": 80, "healthCheckTimeoutSeconds": 600, "emitEvents": false}}"#
        )
        .unwrap();

        let config = PlannerConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.min_healthy_percent, 80);
        assert_eq!(config.health_gate().timeout, Duration::from_secs(600));
        assert!(!config.emit_events);
    }

    #[test]
    fn test_missing_file() {
        let err = PlannerConfig::from_json_file("/nonexistent/deployflow.json").unwrap_err();
        assert!(matches!(err, DeployflowError::Io(_)));
    }
}
