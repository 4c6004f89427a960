//! Reference executor for composed flows.
//!
//! [`FlowExecutor`] walks a [`crate::flow::ComposedFlow`] against a
//! [`CloudDriver`], honouring dependency order, failure triggers,
//! cancellation and destroy-time re-validation of targets.

mod cancellation;
mod driver;
mod executor;

pub use cancellation::CancellationToken;
pub use driver::{CloudDriver, CreateServerGroup};
pub use executor::{ExecutionOutcome, ExecutionReport, FlowExecutor};
