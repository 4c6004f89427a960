//! The deploy request accepted by the planner.

use crate::errors::RequestValidationError;
use serde::{Deserialize, Serialize};

/// The server-group spec a deploy clones into a new group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetServerGroupSpec {
    /// Machine image to launch.
    pub image: String,
    /// Launch configuration (instance type, user data, ...) name.
    pub launch_configuration: String,
    /// Desired instance count.
    pub target_capacity: u32,
}

impl TargetServerGroupSpec {
    /// Creates a new target spec.
    #[must_use]
    pub fn new(
        image: impl Into<String>,
        launch_configuration: impl Into<String>,
        target_capacity: u32,
    ) -> Self {
        Self {
            image: image.into(),
            launch_configuration: launch_configuration.into(),
            target_capacity,
        }
    }
}

/// A request to plan a deployment stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployRequest {
    /// Application name.
    pub application: String,
    /// Cluster name.
    pub cluster: String,
    /// Cloud account.
    pub account: String,
    /// Cloud region.
    pub region: String,
    /// Strategy key; absent falls back to the configured default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<String>,
    /// The server-group spec to deploy.
    pub target_server_group_spec: TargetServerGroupSpec,
    /// Delay before disabling the previous group, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_delay_seconds: Option<u64>,
    /// Number of existing groups to retain; absent means unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_remaining_group_count: Option<u32>,
}

impl DeployRequest {
    /// Creates a request with no strategy, no rollback delay and unlimited retention.
    #[must_use]
    pub fn new(
        application: impl Into<String>,
        cluster: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        target_server_group_spec: TargetServerGroupSpec,
    ) -> Self {
        Self {
            application: application.into(),
            cluster: cluster.into(),
            account: account.into(),
            region: region.into(),
            strategy: None,
            target_server_group_spec,
            rollback_delay_seconds: None,
            max_remaining_group_count: None,
        }
    }

    /// Sets the strategy key.
    #[must_use]
    pub fn with_strategy(mut self, strategy: impl Into<String>) -> Self {
        self.strategy = Some(strategy.into());
        self
    }

    /// Sets the rollback delay.
    #[must_use]
    pub fn with_rollback_delay_seconds(mut self, seconds: u64) -> Self {
        self.rollback_delay_seconds = Some(seconds);
        self
    }

    /// Sets the retention count.
    #[must_use]
    pub fn with_max_remaining_group_count(mut self, count: u32) -> Self {
        self.max_remaining_group_count = Some(count);
        self
    }

    /// Validates the request.
    ///
    /// # Errors
    ///
    /// Returns the first offending field: a blank identifier or image, a zero
    /// target capacity, or a zero retention count.
    pub fn validate(&self) -> Result<(), RequestValidationError> {
        let required = [
            ("application", &self.application),
            ("cluster", &self.cluster),
            ("account", &self.account),
            ("region", &self.region),
            ("targetServerGroupSpec.image", &self.target_server_group_spec.image),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(RequestValidationError::blank(field));
            }
        }

        if self.target_server_group_spec.target_capacity == 0 {
            return Err(RequestValidationError::new(
                "targetServerGroupSpec.targetCapacity",
                "must be greater than zero",
            ));
        }

        if self.max_remaining_group_count == Some(0) {
            return Err(RequestValidationError::new(
                "maxRemainingGroupCount",
                "must be a positive integer when present",
            ));
        }

        Ok(())
    }
}
