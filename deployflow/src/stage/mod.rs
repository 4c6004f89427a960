//! The deploy-strategy stage: the planner's entry point.

mod deploy_strategy;

pub use deploy_strategy::{DeployStrategyStage, DeploymentPlan};
