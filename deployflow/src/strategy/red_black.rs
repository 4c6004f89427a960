//! Red/black: cut traffic over to a new group, then disable the previous one.

use super::common::{add_deploy_steps, existing_group_stage, ids};
use crate::context::{ClusterSnapshot, ServerGroup, StageContext};
use crate::core::SubStageType;
use crate::errors::FlowValidationError;
use crate::flow::{params, ComposedFlow, FlowBuilder, SubStageSpec};
use std::time::Duration;

pub(super) fn compose(
    ctx: &StageContext,
    snapshot: &ClusterSnapshot,
) -> Result<ComposedFlow, FlowValidationError> {
    let mut flow = FlowBuilder::new();
    add_deploy_steps(&mut flow, ctx)?;

    let delay = ctx.rollback_delay().filter(|d| !d.is_zero());
    let mut disable_ids = Vec::new();
    for group in snapshot.enabled_groups() {
        let spec = match delay {
            Some(delay) => scheduled_disable(ctx, group, delay),
            None => existing_group_stage(ids::disable(&group.name), SubStageType::Disable, ctx, group),
        }
        .with_dependency(ids::ENABLE);
        disable_ids.push(spec.id.clone());
        flow.add(spec)?;
    }

    if let Some(retain) = ctx.max_remaining_group_count() {
        let excess = snapshot.len().saturating_sub(retain as usize);
        let shrink_after = if disable_ids.is_empty() {
            vec![ids::ENABLE.to_string()]
        } else {
            disable_ids
        };
        for group in snapshot.oldest_first().into_iter().take(excess) {
            flow.add(
                existing_group_stage(ids::shrink(&group.name), SubStageType::Shrink, ctx, group)
                    .with_dependencies(shrink_after.iter().cloned()),
            )?;
        }
    }

    // Contingency: only reachable when WaitHealthy fails, and only ever
    // targets the group this flow created.
    flow.add(
        SubStageSpec::new(ids::ROLLBACK, SubStageType::Rollback)
            .with_dependency(ids::WAIT_HEALTHY)
            .with_param(params::SERVER_GROUP_FROM, ids::CREATE)
            .with_param(params::REASON, "new server group failed its health check")
            .on_failure(),
    )?;

    Ok(flow.build())
}

fn scheduled_disable(
    ctx: &StageContext,
    group: &ServerGroup,
    delay: Duration,
) -> SubStageSpec {
    existing_group_stage(
        ids::scheduled_disable(&group.name),
        SubStageType::ScheduledDisable,
        ctx,
        group,
    )
    .with_param(params::DELAY_SECONDS, delay.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SubStageType::{
        Create, Disable, Enable, Rollback, ScheduledDisable, Shrink, WaitHealthy,
    };
    use crate::flow::Trigger;
    use crate::testing::{assert_depends_on, fixtures, primary_stage_types};
    use pretty_assertions::assert_eq;
    use std::collections::BTreeSet;

    #[test]
    fn test_first_deploy_has_no_disable_destroy_or_shrink() {
        let ctx = fixtures::stage_context().with_max_remaining_group_count(2);
        let flow = compose(&ctx, &ClusterSnapshot::empty()).unwrap();

        assert_eq!(primary_stage_types(&flow), vec![Create, WaitHealthy, Enable]);
        assert_depends_on(&flow, "wait_healthy", &["create"]);
        assert_depends_on(&flow, "enable", &["wait_healthy"]);
    }

    #[test]
    fn test_previous_enabled_group_is_disabled_after_enable() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-main-v001", true)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        assert_eq!(primary_stage_types(&flow), vec![Create, WaitHealthy, Enable, Disable]);
        assert_depends_on(&flow, "disable-app-main-v001", &["enable"]);
        let disable = flow.get("disable-app-main-v001").unwrap();
        assert_eq!(disable.param_str(params::SERVER_GROUP_NAME), Some("app-main-v001"));
    }

    #[test]
    fn test_disabled_groups_are_not_disabled_again() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-main-v001", false), ("app-main-v002", true)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        let targets: Vec<_> = flow
            .of_type(Disable)
            .iter()
            .filter_map(|s| s.param_str(params::SERVER_GROUP_NAME))
            .collect();
        assert_eq!(targets, vec!["app-main-v002"]);
    }

    #[test]
    fn test_rollback_delay_schedules_the_disable() {
        let ctx = fixtures::stage_context().with_rollback_delay(Duration::from_secs(600));
        let snapshot = fixtures::snapshot(&[("app-main-v001", true)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        assert_eq!(
            primary_stage_types(&flow),
            vec![Create, WaitHealthy, Enable, ScheduledDisable]
        );
        let scheduled = flow.get("scheduled_disable-app-main-v001").unwrap();
        assert_eq!(scheduled.param_u64(params::DELAY_SECONDS), Some(600));
        assert_depends_on(&flow, "scheduled_disable-app-main-v001", &["enable"]);
    }

    #[test]
    fn test_zero_rollback_delay_disables_immediately() {
        let ctx = fixtures::stage_context().with_rollback_delay(Duration::ZERO);
        let snapshot = fixtures::snapshot(&[("app-main-v001", true)]);

        let flow = compose(&ctx, &snapshot).unwrap();
        assert_eq!(flow.of_type(Disable).len(), 1);
        assert!(flow.of_type(ScheduledDisable).is_empty());
    }

    #[test]
    fn test_retention_of_one_keeps_the_single_previous_group() {
        let ctx = fixtures::stage_context().with_max_remaining_group_count(1);
        let snapshot = fixtures::snapshot(&[("app-main-v001", true)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        assert_eq!(flow.of_type(Disable).len(), 1);
        assert!(flow.of_type(Shrink).is_empty());
        assert!(flow.of_type(crate::core::SubStageType::Destroy).is_empty());
    }

    #[test]
    fn test_shrink_destroys_oldest_excess_groups_after_disable() {
        let ctx = fixtures::stage_context().with_max_remaining_group_count(1);
        let snapshot = fixtures::snapshot(&[
            ("app-main-v001", false),
            ("app-main-v002", false),
            ("app-main-v003", true),
        ]);

        let flow = compose(&ctx, &snapshot).unwrap();

        let shrink_ids: Vec<&str> = flow.of_type(Shrink).iter().map(|s| s.id.as_str()).collect();
        assert_eq!(shrink_ids, vec!["shrink-app-main-v001", "shrink-app-main-v002"]);
        assert_depends_on(&flow, "shrink-app-main-v001", &["disable-app-main-v003"]);
        assert_depends_on(&flow, "shrink-app-main-v002", &["disable-app-main-v003"]);
    }

    #[test]
    fn test_shrink_depends_on_enable_when_nothing_was_enabled() {
        let ctx = fixtures::stage_context().with_max_remaining_group_count(1);
        let snapshot = fixtures::snapshot(&[("app-main-v001", false), ("app-main-v002", false)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        assert!(flow.of_type(Disable).is_empty());
        assert_depends_on(&flow, "shrink-app-main-v001", &["enable"]);
        assert!(flow.get("shrink-app-main-v002").is_none());
    }

    #[test]
    fn test_unlimited_retention_never_shrinks() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[
            ("app-main-v001", false),
            ("app-main-v002", false),
            ("app-main-v003", true),
        ]);

        let flow = compose(&ctx, &snapshot).unwrap();
        assert!(flow.of_type(Shrink).is_empty());
    }

    #[test]
    fn test_rollback_is_a_wait_healthy_contingency_for_the_new_group_only() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-main-v001", true)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        let rollback = flow.get("rollback").unwrap();
        assert_eq!(rollback.stage_type, Rollback);
        assert_eq!(rollback.trigger, Trigger::OnFailure);
        assert_eq!(rollback.depends_on, BTreeSet::from(["wait_healthy".to_string()]));
        assert_eq!(rollback.param_str(params::SERVER_GROUP_FROM), Some("create"));
        assert_eq!(rollback.param_str(params::SERVER_GROUP_NAME), None);
        assert_eq!(flow.specs().last().map(|s| s.id.as_str()), Some("rollback"));

        // Nothing downstream of the rollback can touch the previous group.
        assert!(flow.successors("rollback").is_empty());
    }

    #[test]
    fn test_wait_healthy_carries_the_health_gate() {
        let ctx = fixtures::stage_context();
        let flow = compose(&ctx, &ClusterSnapshot::empty()).unwrap();

        let wait = flow.get("wait_healthy").unwrap();
        assert_eq!(wait.param_u64(params::MIN_HEALTHY_PERCENT), Some(100));
        assert_eq!(wait.param_u64(params::TIMEOUT_SECONDS), Some(1800));
        assert_eq!(wait.param_str(params::SERVER_GROUP_FROM), Some("create"));
    }

    #[test]
    fn test_composition_is_deterministic() {
        let ctx = fixtures::stage_context()
            .with_max_remaining_group_count(1)
            .with_rollback_delay(Duration::from_secs(30));
        let snapshot = fixtures::snapshot(&[
            ("app-main-v002", true),
            ("app-main-v001", false),
        ]);

        let first = compose(&ctx, &snapshot).unwrap();
        let second = compose(&ctx, &snapshot).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.fingerprint(), second.fingerprint());
    }
}
