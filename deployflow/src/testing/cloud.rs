//! An in-memory cloud for tests and demos.

use crate::context::ServerGroup;
use crate::errors::{ClusterStateError, DriverError};
use crate::execution::{CloudDriver, CreateServerGroup};
use crate::providers::{ClusterLocation, ClusterStateProvider};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A mutating cloud operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    /// `create_server_group`
    Create,
    /// `wait_for_healthy`
    WaitHealthy,
    /// `enable_server_group`
    Enable,
    /// `disable_server_group`
    Disable,
    /// `destroy_server_group`
    Destroy,
}

/// One applied operation, as recorded in the operation log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudOperation {
    /// What was done.
    pub kind: OperationKind,
    /// The group it was done to.
    pub server_group: String,
    /// Disable delay, if any.
    pub delay: Option<Duration>,
}

impl CloudOperation {
    /// Creates a log entry without a delay.
    #[must_use]
    pub fn new(kind: OperationKind, server_group: impl Into<String>) -> Self {
        Self {
            kind,
            server_group: server_group.into(),
            delay: None,
        }
    }

    /// Sets the delay.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

type Hook = Arc<dyn Fn(&InMemoryCloud) + Send + Sync>;

#[derive(Default)]
struct CloudState {
    clusters: HashMap<ClusterLocation, Vec<ServerGroup>>,
    next_sequence: HashMap<ClusterLocation, u32>,
    failing: HashSet<OperationKind>,
    fetch_failure: Option<String>,
    operations: Vec<CloudOperation>,
}

/// Cluster state and cloud driver backed by a map.
///
/// New groups are named `<cluster>-vNNN` with a sequence that never goes
/// backwards, even when the cluster is re-seeded. Hooks registered with
/// [`InMemoryCloud::after`] run after an operation is applied, which lets a
/// test cancel a flow or race it with an out-of-band change at a precise point.
#[derive(Default)]
pub struct InMemoryCloud {
    state: Mutex<CloudState>,
    hooks: Mutex<Vec<(OperationKind, Hook)>>,
    fetches: AtomicUsize,
}

impl InMemoryCloud {
    /// Creates an empty cloud.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the groups in a cluster.
    pub fn seed(&self, location: &ClusterLocation, groups: Vec<ServerGroup>) {
        let mut state = self.state.lock();
        let next = groups
            .iter()
            .filter_map(|g| sequence_of(&g.name))
            .max()
            .map_or(1, |n| n + 1);
        let counter = state.next_sequence.entry(location.clone()).or_insert(1);
        *counter = (*counter).max(next);
        state.clusters.insert(location.clone(), groups);
    }

    /// Inserts a group, replacing any group with the same name.
    pub fn upsert(&self, location: &ClusterLocation, group: ServerGroup) {
        let mut state = self.state.lock();
        let groups = state.clusters.entry(location.clone()).or_default();
        groups.retain(|g| g.name != group.name);
        groups.push(group);
    }

    /// Returns the groups currently in a cluster.
    #[must_use]
    pub fn groups(&self, location: &ClusterLocation) -> Vec<ServerGroup> {
        self.state.lock().clusters.get(location).cloned().unwrap_or_default()
    }

    /// Returns a group by name.
    #[must_use]
    pub fn group(&self, location: &ClusterLocation, name: &str) -> Option<ServerGroup> {
        self.groups(location).into_iter().find(|g| g.name == name)
    }

    /// Makes every future `kind` operation fail.
    pub fn fail_operation(&self, kind: OperationKind) {
        self.state.lock().failing.insert(kind);
    }

    /// Makes every future cluster-state read fail.
    pub fn fail_fetches(&self, reason: impl Into<String>) {
        self.state.lock().fetch_failure = Some(reason.into());
    }

    /// Registers a hook to run after each applied `kind` operation.
    pub fn after(&self, kind: OperationKind, hook: impl Fn(&Self) + Send + Sync + 'static) {
        self.hooks.lock().push((kind, Arc::new(hook)));
    }

    /// Returns the applied operations in order.
    #[must_use]
    pub fn operations(&self) -> Vec<CloudOperation> {
        self.state.lock().operations.clone()
    }

    /// Returns the groups that `kind` was applied to, in order.
    #[must_use]
    pub fn targets_of(&self, kind: OperationKind) -> Vec<String> {
        self.state
            .lock()
            .operations
            .iter()
            .filter(|op| op.kind == kind)
            .map(|op| op.server_group.clone())
            .collect()
    }

    /// Returns the number of cluster-state reads served.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn apply(
        &self,
        location: &ClusterLocation,
        operation: CloudOperation,
        mutate: impl FnOnce(&mut Vec<ServerGroup>) -> Result<(), DriverError>,
    ) -> Result<(), DriverError> {
        {
            let mut state = self.state.lock();
            if state.failing.contains(&operation.kind) {
                return Err(injected_failure(&operation));
            }
            mutate(state.clusters.entry(location.clone()).or_default())?;
            state.operations.push(operation.clone());
        }
        self.run_hooks(operation.kind);
        Ok(())
    }

    fn run_hooks(&self, kind: OperationKind) {
        let hooks: Vec<Hook> = self
            .hooks
            .lock()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, hook)| Arc::clone(hook))
            .collect();
        for hook in hooks {
            hook(self);
        }
    }
}

impl fmt::Debug for InMemoryCloud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryCloud")
            .field("operations", &self.operations())
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}

fn sequence_of(name: &str) -> Option<u32> {
    name.rsplit_once("-v").and_then(|(_, n)| n.parse().ok())
}

fn injected_failure(operation: &CloudOperation) -> DriverError {
    match operation.kind {
        OperationKind::WaitHealthy => DriverError::HealthCheckTimeout {
            server_group: operation.server_group.clone(),
            timeout_seconds: operation.delay.map_or(0, |d| d.as_secs()),
        },
        kind => DriverError::operation_failed(
            format!("{kind:?}"),
            &operation.server_group,
            "injected failure",
        ),
    }
}

fn find_mut<'a>(groups: &'a mut [ServerGroup], name: &str) -> Result<&'a mut ServerGroup, DriverError> {
    groups
        .iter_mut()
        .find(|g| g.name == name)
        .ok_or_else(|| DriverError::ServerGroupNotFound {
            server_group: name.to_string(),
        })
}

#[async_trait]
impl ClusterStateProvider for InMemoryCloud {
    async fn get_server_groups(
        &self,
        cluster: &str,
        account: &str,
        region: &str,
    ) -> Result<Vec<ServerGroup>, ClusterStateError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock();
        if let Some(reason) = &state.fetch_failure {
            return Err(ClusterStateError::unavailable(reason.clone()));
        }
        let location = ClusterLocation::new(cluster, account, region);
        Ok(state.clusters.get(&location).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl CloudDriver for InMemoryCloud {
    async fn create_server_group(
        &self,
        location: &ClusterLocation,
        _request: &CreateServerGroup,
    ) -> Result<String, DriverError> {
        let name = {
            let mut state = self.state.lock();
            let counter = state.next_sequence.entry(location.clone()).or_insert(1);
            let name = format!("{}-v{:03}", location.cluster, *counter);
            *counter += 1;
            name
        };
        let group = ServerGroup::new(name.clone(), Utc::now()).disabled();
        self.apply(
            location,
            CloudOperation::new(OperationKind::Create, &name),
            |groups| {
                groups.push(group);
                Ok(())
            },
        )?;
        Ok(name)
    }

    async fn wait_for_healthy(
        &self,
        location: &ClusterLocation,
        server_group: &str,
        _min_healthy_percent: u8,
        timeout: Duration,
    ) -> Result<(), DriverError> {
        let operation = CloudOperation::new(OperationKind::WaitHealthy, server_group);
        if self.state.lock().failing.contains(&OperationKind::WaitHealthy) {
            return Err(injected_failure(&operation.with_delay(timeout)));
        }
        self.apply(location, operation, |groups| {
            let group = find_mut(groups, server_group)?;
            if group.healthy {
                Ok(())
            } else {
                Err(DriverError::HealthCheckTimeout {
                    server_group: server_group.to_string(),
                    timeout_seconds: timeout.as_secs(),
                })
            }
        })
    }

    async fn enable_server_group(
        &self,
        location: &ClusterLocation,
        server_group: &str,
    ) -> Result<(), DriverError> {
        self.apply(
            location,
            CloudOperation::new(OperationKind::Enable, server_group),
            |groups| {
                find_mut(groups, server_group)?.enabled = true;
                Ok(())
            },
        )
    }

    async fn disable_server_group(
        &self,
        location: &ClusterLocation,
        server_group: &str,
        delay: Option<Duration>,
    ) -> Result<(), DriverError> {
        let mut operation = CloudOperation::new(OperationKind::Disable, server_group);
        operation.delay = delay;
        self.apply(location, operation, |groups| {
            find_mut(groups, server_group)?.enabled = false;
            Ok(())
        })
    }

    async fn destroy_server_group(
        &self,
        location: &ClusterLocation,
        server_group: &str,
    ) -> Result<(), DriverError> {
        self.apply(
            location,
            CloudOperation::new(OperationKind::Destroy, server_group),
            |groups| {
                let before = groups.len();
                groups.retain(|g| g.name != server_group);
                if groups.len() == before {
                    Err(DriverError::ServerGroupNotFound {
                        server_group: server_group.to_string(),
                    })
                } else {
                    Ok(())
                }
            },
        )
    }
}
