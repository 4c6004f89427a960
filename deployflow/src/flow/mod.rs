//! Composed flows and their validation.
//!
//! This module provides:
//! - Sub-stage specifications with dependency edges
//! - A validating flow builder
//! - The composed flow with ordering, wave and fingerprint helpers

mod builder;
mod composed;
mod spec;

pub use builder::FlowBuilder;
pub use composed::ComposedFlow;
pub use spec::{params, SubStageSpec, Trigger};
