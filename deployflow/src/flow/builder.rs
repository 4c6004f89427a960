//! Flow builder with validation.

use super::{ComposedFlow, SubStageSpec};
use crate::errors::{ErrorInfo, FlowValidationError};
use std::collections::HashSet;

/// Builder for creating validated flows.
///
/// Predecessors must be added before the sub-stages that depend on them, so
/// a flow built this way is always acyclic and already in a valid execution
/// order.
#[derive(Debug, Clone, Default)]
pub struct FlowBuilder {
    specs: Vec<SubStageSpec>,
    ids: HashSet<String>,
}

impl FlowBuilder {
    /// Creates a new flow builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sub-stage to the flow.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails (duplicate id, missing predecessor, ...).
    pub fn stage(mut self, spec: SubStageSpec) -> Result<Self, FlowValidationError> {
        self.add(spec)?;
        Ok(self)
    }

    /// Adds a sub-stage specification.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec is invalid on its own, reuses an id, or
    /// depends on a sub-stage that has not been added yet.
    pub fn add(&mut self, spec: SubStageSpec) -> Result<(), FlowValidationError> {
        spec.validate()?;

        if self.ids.contains(&spec.id) {
            return Err(FlowValidationError::new(format!(
                "Duplicate sub-stage id '{}'",
                spec.id
            ))
            .with_sub_stages(vec![spec.id.clone()])
            .with_error_info(
                ErrorInfo::new("FLOW-001-DUPLICATE", format!("Id '{}' is already in use", spec.id))
                    .with_fix_hint("Give every sub-stage a unique id."),
            ));
        }

        if let Some(dep) = spec.depends_on.iter().find(|dep| !self.ids.contains(*dep)) {
            return Err(missing_dependency(&spec.id, dep));
        }

        self.ids.insert(spec.id.clone());
        self.specs.push(spec);
        Ok(())
    }

    /// Returns true if a sub-stage with this id was added.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Returns the number of sub-stages added so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Returns true if nothing was added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    /// Builds the flow. An empty builder yields an empty flow.
    #[must_use]
    pub fn build(self) -> ComposedFlow {
        ComposedFlow::from_validated(self.specs)
    }
}

pub(super) fn missing_dependency(id: &str, dep: &str) -> FlowValidationError {
    FlowValidationError::new(format!(
        "Sub-stage '{id}' depends on unknown sub-stage '{dep}'"
    ))
    .with_sub_stages(vec![id.to_string(), dep.to_string()])
    .with_error_info(
        ErrorInfo::new("FLOW-003-MISSING_DEP", format!("Dependency '{dep}' not found"))
            .with_fix_hint("Ensure the dependency is added before the sub-stage that depends on it."),
    )
}
