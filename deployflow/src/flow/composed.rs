//! The composed flow handed to the execution engine.

use super::builder::missing_dependency;
use super::SubStageSpec;
use crate::core::SubStageType;
use crate::errors::{CycleDetectedError, ErrorInfo, FlowValidationError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};

/// An ordered, dependency-annotated sequence of sub-stages.
///
/// The empty flow is a valid value (the `none` strategy). Dependency edges,
/// not array position, decide what may run concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SubStageSpec>", into = "Vec<SubStageSpec>")]
pub struct ComposedFlow {
    specs: Vec<SubStageSpec>,
}

impl ComposedFlow {
    /// Creates an empty flow.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(super) fn from_validated(specs: Vec<SubStageSpec>) -> Self {
        Self { specs }
    }

    /// Validates specs received in arbitrary order and wraps them in a flow.
    ///
    /// # Errors
    ///
    /// Returns an error on a blank or duplicate id, a self-dependency, an
    /// unknown predecessor, or a dependency cycle.
    pub fn from_specs(specs: Vec<SubStageSpec>) -> Result<Self, FlowValidationError> {
        let mut ids = HashSet::new();
        for spec in &specs {
            spec.validate()?;
            if !ids.insert(spec.id.as_str()) {
                return Err(FlowValidationError::new(format!(
                    "Duplicate sub-stage id '{}'",
                    spec.id
                ))
                .with_sub_stages(vec![spec.id.clone()])
                .with_error_info(ErrorInfo::new(
                    "FLOW-001-DUPLICATE",
                    format!("Id '{}' is already in use", spec.id),
                )));
            }
        }

        for spec in &specs {
            if let Some(dep) = spec.depends_on.iter().find(|dep| !ids.contains(dep.as_str())) {
                return Err(missing_dependency(&spec.id, dep));
            }
        }

        let flow = Self { specs };
        flow.detect_cycles()?;
        Ok(flow)
    }

    /// Returns the sub-stages in composition order.
    #[must_use]
    pub fn specs(&self) -> &[SubStageSpec] {
        &self.specs
    }

    /// Consumes the flow, returning its sub-stages.
    #[must_use]
    pub fn into_specs(self) -> Vec<SubStageSpec> {
        self.specs
    }

    /// Returns the number of sub-stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if the flow has no sub-stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Looks up a sub-stage by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SubStageSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    /// Returns the stage types in composition order.
    #[must_use]
    pub fn stage_types(&self) -> Vec<SubStageType> {
        self.specs.iter().map(|s| s.stage_type).collect()
    }

    /// Returns every sub-stage of the given type, in composition order.
    #[must_use]
    pub fn of_type(&self, stage_type: SubStageType) -> Vec<&SubStageSpec> {
        self.specs.iter().filter(|s| s.stage_type == stage_type).collect()
    }

    /// Returns the ids of the sub-stages that directly depend on `id`.
    #[must_use]
    pub fn successors(&self, id: &str) -> Vec<&str> {
        self.specs
            .iter()
            .filter(|s| s.depends_on.contains(id))
            .map(|s| s.id.as_str())
            .collect()
    }

    /// Returns a topological order, breaking ties by composition order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<&str> {
        let mut emitted: HashSet<&str> = HashSet::new();
        let mut order = Vec::with_capacity(self.specs.len());

        while order.len() < self.specs.len() {
            let next = self.specs.iter().find(|s| {
                !emitted.contains(s.id.as_str())
                    && s.depends_on.iter().all(|d| emitted.contains(d.as_str()))
            });
            match next {
                Some(spec) => {
                    emitted.insert(spec.id.as_str());
                    order.push(spec.id.as_str());
                }
                // Unreachable for validated flows.
                None => break,
            }
        }

        order
    }

    /// Groups sub-stages into waves: every predecessor of a sub-stage lies in
    /// an earlier wave, so the members of one wave may run concurrently.
    #[must_use]
    pub fn waves(&self) -> Vec<Vec<&str>> {
        let mut level: HashMap<&str, usize> = HashMap::new();
        let mut waves: Vec<Vec<&str>> = Vec::new();

        for id in self.execution_order() {
            let depth = self
                .get(id)
                .map(|spec| {
                    spec.depends_on
                        .iter()
                        .filter_map(|d| level.get(d.as_str()))
                        .map(|l| l + 1)
                        .max()
                        .unwrap_or(0)
                })
                .unwrap_or(0);
            level.insert(id, depth);
            if waves.len() <= depth {
                waves.resize_with(depth + 1, Vec::new);
            }
            waves[depth].push(id);
        }

        waves
    }

    /// Returns a stable SHA-256 fingerprint of the flow.
    ///
    /// Structurally identical flows (same ids, types, order, parameters and
    /// edges) have identical fingerprints.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let json = serde_json::to_string(&self.specs).unwrap_or_default();
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let deps: HashMap<&str, &SubStageSpec> =
            self.specs.iter().map(|s| (s.id.as_str(), s)).collect();
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for spec in &self.specs {
            if !visited.contains(spec.id.as_str()) {
                if let Some(cycle) =
                    dfs_cycle(&spec.id, &deps, &mut visited, &mut rec_stack, &mut path)
                {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }

        Ok(())
    }
}

fn dfs_cycle<'a>(
    node: &'a str,
    deps: &HashMap<&'a str, &'a SubStageSpec>,
    visited: &mut HashSet<&'a str>,
    rec_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
) -> Option<Vec<String>> {
    visited.insert(node);
    rec_stack.insert(node);
    path.push(node);

    if let Some(spec) = deps.get(node) {
        for dep in &spec.depends_on {
            let dep = dep.as_str();
            if !visited.contains(dep) {
                if let Some(cycle) = dfs_cycle(dep, deps, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..].iter().map(|s| (*s).to_string()).collect();
                cycle.push(dep.to_string());
                return Some(cycle);
            }
        }
    }

    path.pop();
    rec_stack.remove(node);
    None
}

impl TryFrom<Vec<SubStageSpec>> for ComposedFlow {
    type Error = FlowValidationError;

    fn try_from(specs: Vec<SubStageSpec>) -> Result<Self, Self::Error> {
        Self::from_specs(specs)
    }
}

impl From<ComposedFlow> for Vec<SubStageSpec> {
    fn from(flow: ComposedFlow) -> Self {
        flow.specs
    }
}

impl<'a> IntoIterator for &'a ComposedFlow {
    type Item = &'a SubStageSpec;
    type IntoIter = std::slice::Iter<'a, SubStageSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.specs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SubStageType;
    use pretty_assertions::assert_eq;

    fn spec(id: &str, stage_type: SubStageType, deps: &[&str]) -> SubStageSpec {
        SubStageSpec::new(id, stage_type).with_dependencies(deps.iter().copied())
    }

    fn diamond() -> ComposedFlow {
        ComposedFlow::from_specs(vec![
            spec("create", SubStageType::Create, &[]),
            spec("wait_healthy", SubStageType::WaitHealthy, &["create"]),
            spec("enable", SubStageType::Enable, &["wait_healthy"]),
            spec("destroy-a", SubStageType::Destroy, &["enable"]),
            spec("destroy-b", SubStageType::Destroy, &["enable"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_successors() {
        let flow = diamond();
        assert_eq!(flow.successors("enable"), vec!["destroy-a", "destroy-b"]);
        assert!(flow.successors("destroy-a").is_empty());
    }

    #[test]
    fn test_execution_order_out_of_order_input() {
        let flow = ComposedFlow::from_specs(vec![
            spec("enable", SubStageType::Enable, &["wait_healthy"]),
            spec("wait_healthy", SubStageType::WaitHealthy, &["create"]),
            spec("create", SubStageType::Create, &[]),
        ])
        .unwrap();

        assert_eq!(flow.execution_order(), vec!["create", "wait_healthy", "enable"]);
    }

    #[test]
    fn test_waves() {
        let flow = diamond();
        assert_eq!(
            flow.waves(),
            vec![
                vec!["create"],
                vec!["wait_healthy"],
                vec!["enable"],
                vec!["destroy-a", "destroy-b"],
            ]
        );
    }

    #[test]
    fn test_cycle_detection() {
        let err = ComposedFlow::from_specs(vec![
            spec("a", SubStageType::Create, &["c"]),
            spec("b", SubStageType::WaitHealthy, &["a"]),
            spec("c", SubStageType::Enable, &["b"]),
        ])
        .unwrap_err();

        assert_eq!(err.code(), Some("FLOW-004-CYCLE"));
        assert!(err.message.contains("->"));
    }

    #[test]
    fn test_missing_dependency() {
        let err = ComposedFlow::from_specs(vec![spec("enable", SubStageType::Enable, &["ghost"])])
            .unwrap_err();
        assert_eq!(err.code(), Some("FLOW-003-MISSING_DEP"));
    }

    #[test]
    fn test_duplicate_id() {
        let err = ComposedFlow::from_specs(vec![
            spec("create", SubStageType::Create, &[]),
            spec("create", SubStageType::Create, &[]),
        ])
        .unwrap_err();
        assert_eq!(err.code(), Some("FLOW-001-DUPLICATE"));
    }

    #[test]
    fn test_fingerprint_is_structural() {
        assert_eq!(diamond().fingerprint(), diamond().fingerprint());
        assert_ne!(diamond().fingerprint(), ComposedFlow::empty().fingerprint());
        assert_eq!(diamond().fingerprint().len(), 64);
    }

    #[test]
    fn test_serde_validates_on_deserialize() {
        let flow = diamond();
        let json = serde_json::to_string(&flow).unwrap();
        let back: ComposedFlow = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flow);

        let bad = r#"[{"id": "enable", "stageType": "Enable", "dependsOn": ["ghost"]}]"#;
        assert!(serde_json::from_str::<ComposedFlow>(bad).is_err());
    }

    #[test]
    fn test_empty_flow() {
        let flow = ComposedFlow::empty();
        assert!(flow.is_empty());
        assert!(flow.execution_order().is_empty());
        assert!(flow.waves().is_empty());
        assert_eq!(serde_json::to_string(&flow).unwrap(), "[]");
    }
}
