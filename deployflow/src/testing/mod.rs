//! Testing utilities for deployflow.
//!
//! This module provides:
//! - Canonical fixtures for a single cluster
//! - An in-memory cloud that is both provider and driver
//! - Assertions over flows and execution reports

mod assertions;
mod cloud;
pub mod fixtures;

pub use assertions::{assert_depends_on, assert_status, primary_stage_types};
pub use cloud::{CloudOperation, InMemoryCloud, OperationKind};
