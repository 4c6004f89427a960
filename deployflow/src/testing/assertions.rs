//! Assertions over composed flows and execution reports.

use crate::core::{StageStatus, SubStageType};
use crate::execution::ExecutionReport;
use crate::flow::ComposedFlow;
use std::collections::BTreeSet;

/// Asserts that sub-stage `id` depends on exactly `expected`.
pub fn assert_depends_on(flow: &ComposedFlow, id: &str, expected: &[&str]) {
    let spec = flow
        .get(id)
        .unwrap_or_else(|| panic!("Expected sub-stage '{id}' in flow {:?}", flow.execution_order()));
    let expected: BTreeSet<String> = expected.iter().map(ToString::to_string).collect();
    assert_eq!(
        spec.depends_on, expected,
        "Unexpected dependencies for sub-stage '{id}'"
    );
}

/// Stage types of the non-contingency sub-stages, in flow order.
#[must_use]
pub fn primary_stage_types(flow: &ComposedFlow) -> Vec<SubStageType> {
    flow.specs()
        .iter()
        .filter(|s| !s.is_contingency())
        .map(|s| s.stage_type)
        .collect()
}

/// Asserts that sub-stage `id` ended with `expected`.
pub fn assert_status(report: &ExecutionReport, id: &str, expected: StageStatus) {
    assert_eq!(
        report.status(id),
        Some(expected),
        "Expected status {expected:?} for sub-stage '{id}', outcomes: {:?}",
        report.outcomes
    );
}
