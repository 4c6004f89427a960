//! Canonical inputs shared by tests.

use crate::context::{ClusterSnapshot, DeployRequest, ServerGroup, StageContext, TargetServerGroupSpec};
use crate::providers::ClusterLocation;
use chrono::{DateTime, Duration, Utc};

/// Application used by the fixtures.
pub const APPLICATION: &str = "app";
/// Cluster used by the fixtures.
pub const CLUSTER: &str = "app-main";
/// Account used by the fixtures.
pub const ACCOUNT: &str = "prod";
/// Region used by the fixtures.
pub const REGION: &str = "us-east-1";

/// The fixture cluster's location.
#[must_use]
pub fn location() -> ClusterLocation {
    ClusterLocation::new(CLUSTER, ACCOUNT, REGION)
}

/// The fixture target spec: `ami-123`, `app-lc`, three instances.
#[must_use]
pub fn target() -> TargetServerGroupSpec {
    TargetServerGroupSpec::new("ami-123", "app-lc", 3)
}

/// A stage context for the fixture cluster with default settings.
#[must_use]
pub fn stage_context() -> StageContext {
    StageContext::new(APPLICATION, CLUSTER, ACCOUNT, REGION, target())
}

/// A deploy request for the fixture cluster without a strategy.
#[must_use]
pub fn deploy_request() -> DeployRequest {
    DeployRequest::new(APPLICATION, CLUSTER, ACCOUNT, REGION, target())
}

/// 2024-05-01T00:00:00Z; creation times of fixture groups count up from here.
#[must_use]
pub fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_714_521_600, 0).unwrap_or_default()
}

/// Builds groups from `(name, enabled)` pairs, each created an hour after
/// the previous one.
#[must_use]
pub fn server_groups(groups: &[(&str, bool)]) -> Vec<ServerGroup> {
    groups
        .iter()
        .zip(0i64..)
        .map(|(&(name, enabled), hour)| {
            let group = ServerGroup::new(name, base_time() + Duration::hours(hour));
            if enabled {
                group
            } else {
                group.disabled()
            }
        })
        .collect()
}

/// A snapshot of [`server_groups`].
#[must_use]
pub fn snapshot(groups: &[(&str, bool)]) -> ClusterSnapshot {
    ClusterSnapshot::new(server_groups(groups))
}
