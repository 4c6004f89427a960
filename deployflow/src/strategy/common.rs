//! Steps shared by the red/black and highlander composers.

use crate::context::{ServerGroup, StageContext};
use crate::core::SubStageType;
use crate::errors::FlowValidationError;
use crate::flow::{params, FlowBuilder, SubStageSpec};
use chrono::SecondsFormat;

/// Sub-stage ids used by the composers.
pub mod ids {
    /// Creates the new group.
    pub const CREATE: &str = "create";
    /// Waits for the new group to become healthy.
    pub const WAIT_HEALTHY: &str = "wait_healthy";
    /// Enables the new group.
    pub const ENABLE: &str = "enable";
    /// Destroys the new group after a failed health check.
    pub const ROLLBACK: &str = "rollback";

    /// Id of the sub-stage that disables `group`.
    #[must_use]
    pub fn disable(group: &str) -> String {
        format!("disable-{group}")
    }

    /// Id of the sub-stage that disables `group` after the rollback delay.
    #[must_use]
    pub fn scheduled_disable(group: &str) -> String {
        format!("scheduled_disable-{group}")
    }

    /// Id of the sub-stage that destroys `group`.
    #[must_use]
    pub fn destroy(group: &str) -> String {
        format!("destroy-{group}")
    }

    /// Id of the sub-stage that shrinks `group` out of the cluster.
    #[must_use]
    pub fn shrink(group: &str) -> String {
        format!("shrink-{group}")
    }
}

/// Adds Create, WaitHealthy and Enable, chained in that order.
pub(super) fn add_deploy_steps(
    flow: &mut FlowBuilder,
    ctx: &StageContext,
) -> Result<(), FlowValidationError> {
    let target = ctx.target();
    let gate = ctx.health_gate();

    flow.add(
        SubStageSpec::new(ids::CREATE, SubStageType::Create)
            .with_param(params::APPLICATION, ctx.application())
            .with_param(params::CLUSTER, ctx.cluster())
            .with_param(params::ACCOUNT, ctx.account())
            .with_param(params::REGION, ctx.region())
            .with_param(params::IMAGE, target.image.as_str())
            .with_param(params::LAUNCH_CONFIGURATION, target.launch_configuration.as_str())
            .with_param(params::TARGET_CAPACITY, target.target_capacity),
    )?;

    flow.add(
        SubStageSpec::new(ids::WAIT_HEALTHY, SubStageType::WaitHealthy)
            .with_dependency(ids::CREATE)
            .with_param(params::SERVER_GROUP_FROM, ids::CREATE)
            .with_param(params::MIN_HEALTHY_PERCENT, gate.min_healthy_percent)
            .with_param(params::TIMEOUT_SECONDS, gate.timeout.as_secs()),
    )?;

    flow.add(
        SubStageSpec::new(ids::ENABLE, SubStageType::Enable)
            .with_dependency(ids::WAIT_HEALTHY)
            .with_param(params::SERVER_GROUP_FROM, ids::CREATE),
    )
}

/// Builds a sub-stage that acts on a group captured in the snapshot.
///
/// The snapshot's creation time travels with the target so the executor can
/// tell the original group apart from a same-named group created later.
pub(super) fn existing_group_stage(
    id: String,
    stage_type: SubStageType,
    ctx: &StageContext,
    group: &ServerGroup,
) -> SubStageSpec {
    SubStageSpec::new(id, stage_type)
        .with_param(params::SERVER_GROUP_NAME, group.name.as_str())
        .with_param(
            params::CREATED_AT,
            group.created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        )
        .with_param(params::CLUSTER, ctx.cluster())
        .with_param(params::ACCOUNT, ctx.account())
        .with_param(params::REGION, ctx.region())
}
