//! Sub-stage specifications.

use crate::core::SubStageType;
use crate::errors::{ErrorInfo, FlowValidationError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Well-known parameter keys.
pub mod params {
    /// Application name.
    pub const APPLICATION: &str = "application";
    /// Cluster name.
    pub const CLUSTER: &str = "cluster";
    /// Cloud account.
    pub const ACCOUNT: &str = "account";
    /// Cloud region.
    pub const REGION: &str = "region";
    /// Machine image for a new group.
    pub const IMAGE: &str = "image";
    /// Launch configuration for a new group.
    pub const LAUNCH_CONFIGURATION: &str = "launchConfiguration";
    /// Desired capacity for a new group.
    pub const TARGET_CAPACITY: &str = "targetCapacity";
    /// Name of an existing group targeted by the sub-stage.
    pub const SERVER_GROUP_NAME: &str = "serverGroupName";
    /// Creation time of the targeted group as seen in the snapshot.
    pub const CREATED_AT: &str = "createdAt";
    /// Id of the sub-stage whose created group this sub-stage targets.
    pub const SERVER_GROUP_FROM: &str = "serverGroupFrom";
    /// Minimum healthy-instance percentage.
    pub const MIN_HEALTHY_PERCENT: &str = "minHealthyPercent";
    /// Health-check timeout.
    pub const TIMEOUT_SECONDS: &str = "timeoutSeconds";
    /// Delay before a scheduled disable.
    pub const DELAY_SECONDS: &str = "delaySeconds";
    /// Human-readable reason.
    pub const REASON: &str = "reason";
}

/// When a sub-stage becomes eligible to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// Runs once every predecessor has succeeded.
    #[default]
    OnSuccess,
    /// Contingency: runs only if a predecessor failed.
    OnFailure,
}

/// Specification for a single sub-stage in a composed flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubStageSpec {
    /// Unique id within the flow.
    pub id: String,
    /// The operation this sub-stage performs.
    pub stage_type: SubStageType,
    /// Operation parameters.
    #[serde(default)]
    pub parameters: BTreeMap<String, serde_json::Value>,
    /// Ids of the sub-stages this one depends on.
    #[serde(default)]
    pub depends_on: BTreeSet<String>,
    /// Eligibility rule.
    #[serde(default)]
    pub trigger: Trigger,
}

impl SubStageSpec {
    /// Creates a new sub-stage specification with no parameters or dependencies.
    #[must_use]
    pub fn new(id: impl Into<String>, stage_type: SubStageType) -> Self {
        Self {
            id: id.into(),
            stage_type,
            parameters: BTreeMap::new(),
            depends_on: BTreeSet::new(),
            trigger: Trigger::OnSuccess,
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.depends_on.insert(dep.into());
        self
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.depends_on = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the sub-stage as a contingency that only runs on predecessor failure.
    #[must_use]
    pub fn on_failure(mut self) -> Self {
        self.trigger = Trigger::OnFailure;
        self
    }

    /// Returns true if this sub-stage is a failure contingency.
    #[must_use]
    pub fn is_contingency(&self) -> bool {
        self.trigger == Trigger::OnFailure
    }

    /// Gets a string parameter.
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(serde_json::Value::as_str)
    }

    /// Gets an unsigned integer parameter.
    #[must_use]
    pub fn param_u64(&self, key: &str) -> Option<u64> {
        self.parameters.get(key).and_then(serde_json::Value::as_u64)
    }

    /// Validates the sub-stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is blank or the sub-stage depends on itself.
    pub fn validate(&self) -> Result<(), FlowValidationError> {
        if self.id.trim().is_empty() {
            return Err(FlowValidationError::new("Sub-stage id cannot be empty"));
        }
        if self.depends_on.contains(&self.id) {
            return Err(FlowValidationError::new(format!(
                "Sub-stage '{}' cannot depend on itself",
                self.id
            ))
            .with_sub_stages(vec![self.id.clone()])
            .with_error_info(ErrorInfo::new(
                "FLOW-002-SELF_DEP",
                format!("Sub-stage '{}' lists itself as a predecessor", self.id),
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_creation() {
        let spec = SubStageSpec::new("enable", SubStageType::Enable)
            .with_dependency("wait_healthy")
            .with_param(params::SERVER_GROUP_FROM, "create");

        assert_eq!(spec.id, "enable");
        assert_eq!(spec.depends_on.len(), 1);
        assert_eq!(spec.param_str(params::SERVER_GROUP_FROM), Some("create"));
        assert_eq!(spec.trigger, Trigger::OnSuccess);
    }

    #[test]
    fn test_self_dependency() {
        let spec = SubStageSpec::new("enable", SubStageType::Enable).with_dependency("enable");
        let err = spec.validate().unwrap_err();
        assert_eq!(err.code(), Some("FLOW-002-SELF_DEP"));
    }

    #[test]
    fn test_blank_id() {
        assert!(SubStageSpec::new(" ", SubStageType::Create).validate().is_err());
    }

    #[test]
    fn test_contingency() {
        let spec = SubStageSpec::new("rollback", SubStageType::Rollback).on_failure();
        assert!(spec.is_contingency());
    }

    #[test]
    fn test_serialize_external_shape() {
        let spec = SubStageSpec::new("scheduled_disable-app-v001", SubStageType::ScheduledDisable)
            .with_dependency("enable")
            .with_param(params::DELAY_SECONDS, 300_u64);

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["stageType"], "ScheduledDisable");
        assert_eq!(json["dependsOn"], serde_json::json!(["enable"]));
        assert_eq!(json["parameters"]["delaySeconds"], 300);
        assert_eq!(json["trigger"], "onSuccess");
    }
}
