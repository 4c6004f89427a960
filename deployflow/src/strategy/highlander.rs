//! Highlander: enable a new group, then destroy every other group.

use super::common::{add_deploy_steps, existing_group_stage, ids};
use crate::context::{ClusterSnapshot, StageContext};
use crate::core::SubStageType;
use crate::errors::FlowValidationError;
use crate::flow::{ComposedFlow, FlowBuilder};

pub(super) fn compose(
    ctx: &StageContext,
    snapshot: &ClusterSnapshot,
) -> Result<ComposedFlow, FlowValidationError> {
    let mut flow = FlowBuilder::new();
    add_deploy_steps(&mut flow, ctx)?;

    // The target set is fixed here. Each destroy re-validates its target at
    // execution time and skips anything created after this snapshot.
    for group in snapshot.oldest_first() {
        flow.add(
            existing_group_stage(ids::destroy(&group.name), SubStageType::Destroy, ctx, group)
                .with_dependency(ids::ENABLE),
        )?;
    }

    Ok(flow.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SubStageType::{Create, Destroy, Enable, WaitHealthy};
    use crate::flow::params;
    use crate::testing::{assert_depends_on, fixtures};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_destroys_every_other_group_after_enable() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-v1", true), ("app-v2", false)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        assert_eq!(
            flow.stage_types(),
            vec![Create, WaitHealthy, Enable, Destroy, Destroy]
        );
        let targets: Vec<_> = flow
            .of_type(Destroy)
            .iter()
            .filter_map(|s| s.param_str(params::SERVER_GROUP_NAME))
            .collect();
        assert_eq!(targets, vec!["app-v1", "app-v2"]);
        assert_depends_on(&flow, "destroy-app-v1", &["enable"]);
        assert_depends_on(&flow, "destroy-app-v2", &["enable"]);
    }

    #[test]
    fn test_destroys_share_a_wave() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-v1", true), ("app-v2", false)]);

        let flow = compose(&ctx, &snapshot).unwrap();

        assert_eq!(flow.waves().last().cloned(), Some(vec!["destroy-app-v1", "destroy-app-v2"]));
    }

    #[test]
    fn test_first_deploy_destroys_nothing() {
        let flow = compose(&fixtures::stage_context(), &ClusterSnapshot::empty()).unwrap();
        assert_eq!(flow.stage_types(), vec![Create, WaitHealthy, Enable]);
    }

    #[test]
    fn test_no_rollback_contingency() {
        let snapshot = fixtures::snapshot(&[("app-v1", true)]);
        let flow = compose(&fixtures::stage_context(), &snapshot).unwrap();

        assert!(flow.specs().iter().all(|s| !s.is_contingency()));
    }

    #[test]
    fn test_destroy_carries_snapshot_creation_time() {
        let snapshot = fixtures::snapshot(&[("app-v1", true)]);
        let flow = compose(&fixtures::stage_context(), &snapshot).unwrap();

        let destroy = flow.get("destroy-app-v1").unwrap();
        let expected = snapshot.get("app-v1").unwrap().created_at;
        let recorded = destroy.param_str(params::CREATED_AT).unwrap();
        assert_eq!(
            chrono::DateTime::parse_from_rfc3339(recorded).unwrap(),
            expected
        );
        assert_eq!(destroy.param_str(params::CLUSTER), Some("app-main"));
    }

    #[test]
    fn test_composition_is_deterministic_regardless_of_provider_order() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-v1", true), ("app-v2", false)]);
        let mut reversed: Vec<_> = snapshot.server_groups().to_vec();
        reversed.reverse();
        let reversed = ClusterSnapshot::new(reversed);

        assert_eq!(compose(&ctx, &snapshot).unwrap(), compose(&ctx, &reversed).unwrap());
    }
}
