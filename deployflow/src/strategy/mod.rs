//! Deployment strategies and their flow composers.
//!
//! Each [`Strategy`] variant owns one composition behaviour. Dispatch is a
//! `match` over the closed variant set; there is no per-strategy type
//! hierarchy to extend.

mod common;
mod highlander;
mod red_black;
mod registry;

pub use common::ids;
pub use registry::StrategyRegistry;

use crate::context::{ClusterSnapshot, StageContext};
use crate::errors::FlowValidationError;
use crate::flow::ComposedFlow;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A rollout strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum Strategy {
    /// Create, verify and enable a new group, then disable the previous one.
    RedBlack,
    /// Create, verify and enable a new group, then destroy every other group.
    Highlander,
    /// No cutover orchestration; composes an empty flow.
    #[default]
    None,
}

impl Strategy {
    /// Returns every strategy.
    #[must_use]
    pub fn all() -> [Self; 3] {
        [Self::RedBlack, Self::Highlander, Self::None]
    }

    /// Returns the strategy's immutable key.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Self::RedBlack => "redblack",
            Self::Highlander => "highlander",
            Self::None => "none",
        }
    }
}

/// Turns a stage context and cluster snapshot into a composed flow.
///
/// Implementations are pure: no I/O, and identical inputs yield identical flows.
pub trait FlowComposer {
    /// Composes the flow for this deploy.
    ///
    /// # Errors
    ///
    /// Returns an error only if the composed graph fails validation.
    fn compose_flow(
        &self,
        ctx: &StageContext,
        snapshot: &ClusterSnapshot,
    ) -> Result<ComposedFlow, FlowValidationError>;
}

impl FlowComposer for Strategy {
    fn compose_flow(
        &self,
        ctx: &StageContext,
        snapshot: &ClusterSnapshot,
    ) -> Result<ComposedFlow, FlowValidationError> {
        match self {
            Self::RedBlack => red_black::compose(ctx, snapshot),
            Self::Highlander => highlander::compose(ctx, snapshot),
            Self::None => Ok(ComposedFlow::empty()),
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Strategy {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(StrategyRegistry::resolve(Some(s)))
    }
}

impl From<String> for Strategy {
    fn from(key: String) -> Self {
        StrategyRegistry::resolve(Some(&key))
    }
}

impl From<Strategy> for &'static str {
    fn from(strategy: Strategy) -> Self {
        strategy.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_display_and_from_str() {
        assert_eq!(Strategy::RedBlack.to_string(), "redblack");
        assert_eq!("highlander".parse::<Strategy>(), Ok(Strategy::Highlander));
        assert_eq!("unheard-of".parse::<Strategy>(), Ok(Strategy::None));
    }

    #[test]
    fn test_serde_uses_key() {
        assert_eq!(serde_json::to_string(&Strategy::Highlander).unwrap(), r#""highlander""#);
        let parsed: Strategy = serde_json::from_str(r#""REDBLACK""#).unwrap();
        assert_eq!(parsed, Strategy::RedBlack);
        let unknown: Strategy = serde_json::from_str(r#""bluegreen""#).unwrap();
        assert_eq!(unknown, Strategy::None);
    }

    #[test]
    fn test_none_composes_empty_flow() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-main-v001", true)]);

        let flow = Strategy::None.compose_flow(&ctx, &snapshot).unwrap();
        assert!(flow.is_empty());
    }

    #[test]
    fn test_unknown_key_composes_empty_flow() {
        let ctx = fixtures::stage_context();
        let snapshot = fixtures::snapshot(&[("app-main-v001", true), ("app-main-v002", false)]);

        for key in [None, Some("canary"), Some("")] {
            let flow = StrategyRegistry::resolve(key).compose_flow(&ctx, &snapshot).unwrap();
            assert!(flow.is_empty(), "key {key:?}");
        }
    }
}
