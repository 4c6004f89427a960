//! Cloud operations issued by the executor.

use crate::errors::DriverError;
use crate::flow::{params, SubStageSpec};
use crate::providers::ClusterLocation;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Everything needed to create the new server group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateServerGroup {
    /// Owning application.
    pub application: String,
    /// Machine image.
    pub image: String,
    /// Launch configuration.
    pub launch_configuration: String,
    /// Desired instance count.
    pub target_capacity: u32,
}

impl CreateServerGroup {
    /// Reads the request from a Create sub-stage's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::MalformedParameters`] if a field is missing.
    pub fn from_spec(spec: &SubStageSpec) -> Result<Self, DriverError> {
        let text = |key: &str| {
            spec.param_str(key)
                .map(str::to_string)
                .ok_or_else(|| DriverError::malformed(&spec.id, format!("missing '{key}'")))
        };
        let target_capacity = spec
            .param_u64(params::TARGET_CAPACITY)
            .and_then(|c| u32::try_from(c).ok())
            .ok_or_else(|| {
                DriverError::malformed(&spec.id, format!("missing '{}'", params::TARGET_CAPACITY))
            })?;

        Ok(Self {
            application: text(params::APPLICATION)?,
            image: text(params::IMAGE)?,
            launch_configuration: text(params::LAUNCH_CONFIGURATION)?,
            target_capacity,
        })
    }
}

/// Adapter over the cloud API that mutates server groups.
#[async_trait]
pub trait CloudDriver: Send + Sync {
    /// Creates a server group and returns its name.
    async fn create_server_group(
        &self,
        location: &ClusterLocation,
        request: &CreateServerGroup,
    ) -> Result<String, DriverError>;

    /// Waits until at least `min_healthy_percent` of the group's instances
    /// are healthy, failing with [`DriverError::HealthCheckTimeout`] after `timeout`.
    async fn wait_for_healthy(
        &self,
        location: &ClusterLocation,
        server_group: &str,
        min_healthy_percent: u8,
        timeout: Duration,
    ) -> Result<(), DriverError>;

    /// Attaches the group to traffic.
    async fn enable_server_group(
        &self,
        location: &ClusterLocation,
        server_group: &str,
    ) -> Result<(), DriverError>;

    /// Detaches the group from traffic, after `delay` when given.
    async fn disable_server_group(
        &self,
        location: &ClusterLocation,
        server_group: &str,
        delay: Option<Duration>,
    ) -> Result<(), DriverError>;

    /// Destroys the group.
    async fn destroy_server_group(
        &self,
        location: &ClusterLocation,
        server_group: &str,
    ) -> Result<(), DriverError>;
}
