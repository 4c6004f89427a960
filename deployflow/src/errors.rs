//! Error types for the deployflow planner and executor.
//!
//! Composition-time errors abort the whole stage-graph build; a caller never
//! receives a partially composed flow. Execution-time errors are scoped to a
//! single sub-stage and surface through [`crate::execution::ExecutionReport`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// The main error type for deployflow operations.
#[derive(Debug, Error)]
pub enum DeployflowError {
    /// The cluster-state provider could not produce a snapshot.
    #[error("Cluster state unavailable for {cluster} ({account}/{region}): {source}")]
    ClusterStateUnavailable {
        /// The cluster that was queried.
        cluster: String,
        /// The account that was queried.
        account: String,
        /// The region that was queried.
        region: String,
        /// The underlying provider error.
        #[source]
        source: ClusterStateError,
    },

    /// The deploy request is malformed.
    #[error("{0}")]
    InvalidRequest(#[from] RequestValidationError),

    /// A composed flow failed graph validation.
    #[error("{0}")]
    FlowValidation(#[from] FlowValidationError),

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Metadata attached to validation errors for better diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorInfo {
    /// Error code (e.g., "FLOW-004-CYCLE").
    pub code: String,
    /// Short summary of the error.
    pub summary: String,
    /// Hint for fixing the error.
    pub fix_hint: Option<String>,
    /// Additional context key-value pairs.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
}

impl ErrorInfo {
    /// Creates a new error info.
    #[must_use]
    pub fn new(code: impl Into<String>, summary: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            summary: summary.into(),
            fix_hint: None,
            context: BTreeMap::new(),
        }
    }

    /// Sets the fix hint.
    #[must_use]
    pub fn with_fix_hint(mut self, hint: impl Into<String>) -> Self {
        self.fix_hint = Some(hint.into());
        self
    }

    /// Adds a single context entry.
    #[must_use]
    pub fn with_context_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }
}

/// Error raised when a deploy request fails validation.
#[derive(Debug, Clone, Error)]
#[error("Invalid deploy request: field '{field}' {reason}")]
pub struct RequestValidationError {
    /// The offending field, in its external (camelCase) spelling.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

impl RequestValidationError {
    /// Creates a new request validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Creates an error for a required field that is empty or whitespace-only.
    #[must_use]
    pub fn blank(field: impl Into<String>) -> Self {
        Self::new(field, "must not be empty")
    }
}

/// Error raised when a flow graph is structurally invalid.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FlowValidationError {
    /// The error message.
    pub message: String,
    /// The sub-stage ids involved in the error.
    pub sub_stages: Vec<String>,
    /// Optional error info.
    pub error_info: Option<ErrorInfo>,
}

impl FlowValidationError {
    /// Creates a new flow validation error.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sub_stages: Vec::new(),
            error_info: None,
        }
    }

    /// Sets the sub-stages involved.
    #[must_use]
    pub fn with_sub_stages(mut self, sub_stages: Vec<String>) -> Self {
        self.sub_stages = sub_stages;
        self
    }

    /// Sets the error info.
    #[must_use]
    pub fn with_error_info(mut self, info: ErrorInfo) -> Self {
        self.error_info = Some(info);
        self
    }

    /// Returns the error code, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        self.error_info.as_ref().map(|info| info.code.as_str())
    }
}

/// Error raised when a cycle is detected in a flow graph.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in flow: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The path of sub-stages forming the cycle.
    pub cycle_path: Vec<String>,
    /// Error info.
    pub error_info: ErrorInfo,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        let info = ErrorInfo::new(
            "FLOW-004-CYCLE",
            format!("Flow contains a dependency cycle: {}", cycle_path.join(" -> ")),
        )
        .with_fix_hint("Remove one of the dependencies in the cycle to break it.");

        Self {
            cycle_path,
            error_info: info,
        }
    }
}

impl From<CycleDetectedError> for FlowValidationError {
    fn from(err: CycleDetectedError) -> Self {
        Self {
            message: err.to_string(),
            sub_stages: err.cycle_path.clone(),
            error_info: Some(err.error_info),
        }
    }
}

/// Errors returned by a [`crate::providers::ClusterStateProvider`].
#[derive(Debug, Clone, Error)]
pub enum ClusterStateError {
    /// The backing cluster-state service could not be reached or answered with an error.
    #[error("cluster state service unavailable: {reason}")]
    Unavailable {
        /// Why the service is unavailable.
        reason: String,
    },
}

impl ClusterStateError {
    /// Creates an unavailable error.
    #[must_use]
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }
}

/// Errors returned by a [`crate::execution::CloudDriver`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DriverError {
    /// The server group did not reach the required healthy percentage in time.
    #[error("Health check timed out for {server_group} after {timeout_seconds}s")]
    HealthCheckTimeout {
        /// The server group being checked.
        server_group: String,
        /// The timeout that elapsed.
        timeout_seconds: u64,
    },

    /// The server group does not exist.
    #[error("Server group not found: {server_group}")]
    ServerGroupNotFound {
        /// The missing server group.
        server_group: String,
    },

    /// A cloud operation failed.
    #[error("{operation} failed for {server_group}: {reason}")]
    OperationFailed {
        /// The operation that failed (e.g. "enable").
        operation: String,
        /// The server group it targeted.
        server_group: String,
        /// The failure reason.
        reason: String,
    },

    /// A sub-stage's parameters could not be interpreted.
    #[error("Malformed parameters for sub-stage '{sub_stage}': {reason}")]
    MalformedParameters {
        /// The sub-stage id.
        sub_stage: String,
        /// What is wrong.
        reason: String,
    },
}

impl DriverError {
    /// Creates an operation-failed error.
    #[must_use]
    pub fn operation_failed(
        operation: impl Into<String>,
        server_group: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::OperationFailed {
            operation: operation.into(),
            server_group: server_group.into(),
            reason: reason.into(),
        }
    }

    /// Creates a malformed-parameters error.
    #[must_use]
    pub fn malformed(sub_stage: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedParameters {
            sub_stage: sub_stage.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this is a health-check timeout.
    #[must_use]
    pub fn is_health_check_timeout(&self) -> bool {
        matches!(self, Self::HealthCheckTimeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_creation() {
        let info = ErrorInfo::new("TEST-001", "Test error")
            .with_fix_hint("Fix this by doing that")
            .with_context_entry("sub_stage", "enable");

        assert_eq!(info.code, "TEST-001");
        assert_eq!(info.summary, "Test error");
        assert_eq!(info.fix_hint, Some("Fix this by doing that".to_string()));
        assert_eq!(info.context.get("sub_stage"), Some(&"enable".to_string()));
    }

    #[test]
    fn test_cycle_detected_error() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
            "a".to_string(),
        ]);

        assert!(err.to_string().contains("a -> b -> c -> a"));
        assert_eq!(err.error_info.code, "FLOW-004-CYCLE");

        let validation: FlowValidationError = err.into();
        assert_eq!(validation.code(), Some("FLOW-004-CYCLE"));
        assert_eq!(validation.sub_stages.len(), 4);
    }

    #[test]
    fn test_cluster_state_unavailable_message() {
        let err = DeployflowError::ClusterStateUnavailable {
            cluster: "app-main".to_string(),
            account: "prod".to_string(),
            region: "us-east-1".to_string(),
            source: ClusterStateError::unavailable("connection refused"),
        };

        let message = err.to_string();
        assert!(message.contains("app-main"));
        assert!(message.contains("prod/us-east-1"));
        assert!(message.contains("connection refused"));
    }

    #[test]
    fn test_request_validation_error() {
        let err: DeployflowError = RequestValidationError::blank("application").into();
        assert_eq!(
            err.to_string(),
            "Invalid deploy request: field 'application' must not be empty"
        );
    }

    #[test]
    fn test_driver_error_classification() {
        let timeout = DriverError::HealthCheckTimeout {
            server_group: "app-v002".to_string(),
            timeout_seconds: 30,
        };
        assert!(timeout.is_health_check_timeout());
        assert!(!DriverError::operation_failed("enable", "app-v002", "boom").is_health_check_timeout());
    }
}
