//! The immutable stage context handed to flow composers.

use super::{DeployRequest, TargetServerGroupSpec};
use crate::config::PlannerConfig;
use std::time::Duration;

/// Health gate applied by the WaitHealthy sub-stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthGate {
    /// Minimum percentage of instances that must report healthy.
    pub min_healthy_percent: u8,
    /// How long to wait before declaring a health-check timeout.
    pub timeout: Duration,
}

impl Default for HealthGate {
    fn default() -> Self {
        Self {
            min_healthy_percent: 100,
            timeout: Duration::from_secs(1800),
        }
    }
}

/// Everything a composer needs to know about the deploy being planned.
///
/// Immutable once constructed: the `with_*` methods consume the value and
/// are only used while building it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageContext {
    application: String,
    cluster: String,
    account: String,
    region: String,
    strategy_key: String,
    target: TargetServerGroupSpec,
    rollback_delay: Option<Duration>,
    max_remaining_group_count: Option<u32>,
    health_gate: HealthGate,
}

impl StageContext {
    /// Creates a context with the `none` strategy key, no rollback delay,
    /// unlimited retention and the default health gate.
    #[must_use]
    pub fn new(
        application: impl Into<String>,
        cluster: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
        target: TargetServerGroupSpec,
    ) -> Self {
        Self {
            application: application.into(),
            cluster: cluster.into(),
            account: account.into(),
            region: region.into(),
            strategy_key: "none".to_string(),
            target,
            rollback_delay: None,
            max_remaining_group_count: None,
            health_gate: HealthGate::default(),
        }
    }

    /// Builds a context from a validated request and the planner configuration.
    ///
    /// `strategy_key` is the key the planner resolved, so that a request
    /// without a strategy records the configured default.
    #[must_use]
    pub fn from_request(request: &DeployRequest, strategy_key: &str, config: &PlannerConfig) -> Self {
        let mut ctx = Self::new(
            &request.application,
            &request.cluster,
            &request.account,
            &request.region,
            request.target_server_group_spec.clone(),
        )
        .with_strategy_key(strategy_key)
        .with_health_gate(config.health_gate());

        if let Some(seconds) = request.rollback_delay_seconds {
            ctx = ctx.with_rollback_delay(Duration::from_secs(seconds));
        }
        if let Some(count) = request.max_remaining_group_count {
            ctx = ctx.with_max_remaining_group_count(count);
        }
        ctx
    }

    /// Sets the strategy key.
    #[must_use]
    pub fn with_strategy_key(mut self, key: impl Into<String>) -> Self {
        self.strategy_key = key.into();
        self
    }

    /// Sets the rollback delay.
    #[must_use]
    pub fn with_rollback_delay(mut self, delay: Duration) -> Self {
        self.rollback_delay = Some(delay);
        self
    }

    /// Sets the retention count.
    #[must_use]
    pub fn with_max_remaining_group_count(mut self, count: u32) -> Self {
        self.max_remaining_group_count = Some(count);
        self
    }

    /// Sets the health gate.
    #[must_use]
    pub fn with_health_gate(mut self, gate: HealthGate) -> Self {
        self.health_gate = gate;
        self
    }

    /// Returns the application name.
    #[must_use]
    pub fn application(&self) -> &str {
        &self.application
    }

    /// Returns the cluster name.
    #[must_use]
    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    /// Returns the account.
    #[must_use]
    pub fn account(&self) -> &str {
        &self.account
    }

    /// Returns the region.
    #[must_use]
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the strategy key.
    #[must_use]
    pub fn strategy_key(&self) -> &str {
        &self.strategy_key
    }

    /// Returns the target server-group spec.
    #[must_use]
    pub fn target(&self) -> &TargetServerGroupSpec {
        &self.target
    }

    /// Returns the rollback delay, if one was configured.
    #[must_use]
    pub fn rollback_delay(&self) -> Option<Duration> {
        self.rollback_delay
    }

    /// Returns the retention count; `None` means unlimited.
    #[must_use]
    pub fn max_remaining_group_count(&self) -> Option<u32> {
        self.max_remaining_group_count
    }

    /// Returns the health gate.
    #[must_use]
    pub fn health_gate(&self) -> HealthGate {
        self.health_gate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let ctx = StageContext::new(
            "app",
            "app-main",
            "prod",
            "us-east-1",
            TargetServerGroupSpec::new("ami-1", "lc-1", 2),
        );

        assert_eq!(ctx.strategy_key(), "none");
        assert_eq!(ctx.rollback_delay(), None);
        assert_eq!(ctx.max_remaining_group_count(), None);
        assert_eq!(ctx.health_gate().min_healthy_percent, 100);
    }

    #[test]
    fn test_from_request() {
        let request = DeployRequest::new(
            "app",
            "app-main",
            "prod",
            "us-east-1",
            TargetServerGroupSpec::new("ami-1", "lc-1", 2),
        )
        .with_rollback_delay_seconds(90)
        .with_max_remaining_group_count(2);
        let config = PlannerConfig::default().with_min_healthy_percent(75);

        let ctx = StageContext::from_request(&request, "redblack", &config);

        assert_eq!(ctx.strategy_key(), "redblack");
        assert_eq!(ctx.cluster(), "app-main");
        assert_eq!(ctx.rollback_delay(), Some(Duration::from_secs(90)));
        assert_eq!(ctx.max_remaining_group_count(), Some(2));
        assert_eq!(ctx.health_gate().min_healthy_percent, 75);
    }
}
