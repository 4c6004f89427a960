//! Inputs to composition.
//!
//! This module provides:
//! - The external deploy request and its validation
//! - The immutable stage context built from it
//! - Immutable cluster snapshots captured once per composition

mod request;
mod snapshot;
mod stage_context;

pub use request::{DeployRequest, TargetServerGroupSpec};
pub use snapshot::{ClusterSnapshot, ServerGroup};
pub use stage_context::{HealthGate, StageContext};
