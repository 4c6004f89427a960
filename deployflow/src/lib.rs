//! # Deployflow
//!
//! Plans server-group deployments as dependency-annotated graphs of
//! sub-stages.
//!
//! A deploy request names a cluster and a rollout strategy. The planner reads
//! the cluster's server groups once, then composes a flow for the strategy:
//!
//! - **redblack**: create, wait healthy, enable, then disable the previous
//!   enabled groups (optionally after a rollback delay) and shrink the
//!   cluster to a retention count; a rollback contingency destroys the new
//!   group if it never becomes healthy
//! - **highlander**: create, wait healthy, enable, then destroy every other group
//! - **none** (and any unknown key): an empty flow
//!
//! Composition is pure. [`execution::FlowExecutor`] runs a composed flow
//! against a [`execution::CloudDriver`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use deployflow::prelude::*;
//!
//! let stage = DeployStrategyStage::new(provider);
//! let request = DeployRequest::new("app", "app-main", "prod", "us-east-1", target)
//!     .with_strategy("redblack");
//! let plan = stage.plan(&request).await?;
//!
//! let report = FlowExecutor::new(driver, provider, plan.location())
//!     .execute(&plan.flow)
//!     .await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod context;
pub mod core;
pub mod errors;
pub mod events;
pub mod execution;
pub mod flow;
pub mod observability;
pub mod providers;
pub mod stage;
pub mod strategy;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::PlannerConfig;
    pub use crate::context::{
        ClusterSnapshot, DeployRequest, HealthGate, ServerGroup, StageContext,
        TargetServerGroupSpec,
    };
    pub use crate::core::{StageStatus, SubStageOutcome, SubStageType};
    pub use crate::errors::{
        ClusterStateError, DeployflowError, DriverError, ErrorInfo, FlowValidationError,
        RequestValidationError,
    };
    pub use crate::events::{CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::execution::{
        CancellationToken, CloudDriver, ExecutionOutcome, ExecutionReport, FlowExecutor,
    };
    pub use crate::flow::{ComposedFlow, FlowBuilder, SubStageSpec, Trigger};
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::providers::{ClusterLocation, ClusterStateProvider};
    pub use crate::stage::{DeployStrategyStage, DeploymentPlan};
    pub use crate::strategy::{FlowComposer, Strategy, StrategyRegistry};
}
