//! Core domain model types for deployflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - Sub-stage type and execution status enums
//! - Sub-stage outcome type with factory methods

mod outcome;
mod status;

pub use outcome::SubStageOutcome;
pub use status::{StageStatus, SubStageType};
