//! Cluster-state provider seam.
//!
//! The planner reads the cluster exactly once per composition through
//! [`ClusterStateProvider`]; the executor reads it again before every destroy.

use crate::context::ServerGroup;
use crate::errors::ClusterStateError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one cluster in one account and region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClusterLocation {
    /// Cluster name.
    pub cluster: String,
    /// Cloud account.
    pub account: String,
    /// Cloud region.
    pub region: String,
}

impl ClusterLocation {
    /// Creates a new location.
    #[must_use]
    pub fn new(
        cluster: impl Into<String>,
        account: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            cluster: cluster.into(),
            account: account.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for ClusterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}/{})", self.cluster, self.account, self.region)
    }
}

/// Source of truth for the server groups currently in a cluster.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClusterStateProvider: Send + Sync {
    /// Returns the server groups currently in the cluster.
    ///
    /// Group names must be unique within the cluster. The planner rejects a
    /// snapshot that repeats a name with a `FLOW-001-DUPLICATE` flow
    /// validation error before anything is executed.
    ///
    /// # Errors
    ///
    /// Returns an error if the cluster state cannot be read; the planner
    /// treats this as fatal to composition.
    async fn get_server_groups(
        &self,
        cluster: &str,
        account: &str,
        region: &str,
    ) -> Result<Vec<ServerGroup>, ClusterStateError>;
}
