//! Runs a composed flow against a cloud driver.
//!
//! Sub-stages start as soon as their predecessors are terminal, so
//! independent branches (e.g. several destroys) run concurrently.

use super::cancellation::CancellationToken;
use super::driver::{CloudDriver, CreateServerGroup};
use crate::core::{StageStatus, SubStageOutcome, SubStageType};
use crate::errors::DriverError;
use crate::events::{EventSink, NoOpEventSink};
use crate::flow::{params, ComposedFlow, SubStageSpec, Trigger};
use crate::observability::SpanTimer;
use crate::providers::{ClusterLocation, ClusterStateProvider};
use chrono::DateTime;
use futures::future::{BoxFuture, FutureExt};
use futures::stream::{FuturesUnordered, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_MIN_HEALTHY_PERCENT: u8 = 100;
const DEFAULT_HEALTH_TIMEOUT_SECONDS: u64 = 1800;

/// Overall result of executing a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionOutcome {
    /// Every sub-stage succeeded or was skipped.
    Succeeded,
    /// At least one sub-stage failed or was blocked.
    Failed,
    /// Cancellation stopped the flow before it finished.
    Cancelled,
}

/// Per-sub-stage outcomes of one flow execution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionReport {
    /// Unique id of this execution.
    pub execution_id: Uuid,
    /// Overall outcome.
    pub outcome: ExecutionOutcome,
    /// Terminal outcome of every sub-stage, keyed by id.
    pub outcomes: BTreeMap<String, SubStageOutcome>,
    /// Sub-stage ids in the order their outcomes were recorded.
    pub completion_order: Vec<String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: f64,
}

impl ExecutionReport {
    /// Returns the outcome of a sub-stage.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SubStageOutcome> {
        self.outcomes.get(id)
    }

    /// Returns the status of a sub-stage.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<StageStatus> {
        self.outcomes.get(id).map(|o| o.status)
    }

    /// Returns true if the flow succeeded.
    #[must_use]
    pub fn succeeded(&self) -> bool {
        self.outcome == ExecutionOutcome::Succeeded
    }

    /// Returns ids whose outcome has the given status, in completion order.
    #[must_use]
    pub fn ids_with_status(&self, status: StageStatus) -> Vec<&str> {
        self.completion_order
            .iter()
            .filter(|id| self.status(id) == Some(status))
            .map(String::as_str)
            .collect()
    }

    fn summarize(outcomes: &BTreeMap<String, SubStageOutcome>) -> ExecutionOutcome {
        let statuses = || outcomes.values().map(|o| o.status);
        if statuses().any(|s| s == StageStatus::Cancel) {
            ExecutionOutcome::Cancelled
        } else if statuses().any(|s| matches!(s, StageStatus::Fail | StageStatus::Blocked)) {
            ExecutionOutcome::Failed
        } else {
            ExecutionOutcome::Succeeded
        }
    }
}

enum Readiness<'a> {
    Waiting,
    Ready,
    Blocked(&'a str),
    NotTriggered,
}

fn readiness<'a>(
    spec: &'a SubStageSpec,
    outcomes: &BTreeMap<String, SubStageOutcome>,
) -> Readiness<'a> {
    match spec.trigger {
        Trigger::OnSuccess => {
            let mut waiting = false;
            for dep in &spec.depends_on {
                match outcomes.get(dep) {
                    Some(outcome) if outcome.is_failure() => return Readiness::Blocked(dep),
                    Some(_) => {}
                    None => waiting = true,
                }
            }
            if waiting {
                Readiness::Waiting
            } else {
                Readiness::Ready
            }
        }
        Trigger::OnFailure => {
            let failed = spec
                .depends_on
                .iter()
                .any(|d| outcomes.get(d).is_some_and(|o| o.status == StageStatus::Fail));
            if failed {
                Readiness::Ready
            } else if spec.depends_on.iter().all(|d| outcomes.contains_key(d)) {
                Readiness::NotTriggered
            } else {
                Readiness::Waiting
            }
        }
    }
}

#[derive(Default)]
struct RunState {
    outcomes: BTreeMap<String, SubStageOutcome>,
    completion_order: Vec<String>,
    // Create sub-stage id -> name of the group it created.
    created: HashMap<String, String>,
}

impl RunState {
    fn resolve_created(&self, spec: &SubStageSpec) -> Option<String> {
        spec.param_str(params::SERVER_GROUP_FROM)
            .and_then(|from| self.created.get(from).cloned())
    }

    fn created_groups(&self) -> Vec<String> {
        self.created.values().cloned().collect()
    }
}

/// Executes composed flows for one cluster.
pub struct FlowExecutor {
    driver: Arc<dyn CloudDriver>,
    provider: Arc<dyn ClusterStateProvider>,
    location: ClusterLocation,
    event_sink: Arc<dyn EventSink>,
    cancellation: Arc<CancellationToken>,
}

impl FlowExecutor {
    /// Creates an executor for the cluster at `location`.
    #[must_use]
    pub fn new(
        driver: Arc<dyn CloudDriver>,
        provider: Arc<dyn ClusterStateProvider>,
        location: ClusterLocation,
    ) -> Self {
        Self {
            driver,
            provider,
            location,
            event_sink: Arc::new(NoOpEventSink),
            cancellation: Arc::new(CancellationToken::new()),
        }
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, token: Arc<CancellationToken>) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn cancellation(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancellation)
    }

    /// Executes the flow to completion.
    ///
    /// Failures are recorded per sub-stage rather than returned: a failed
    /// sub-stage blocks its dependents and triggers any contingency that
    /// depends on it, while unrelated branches keep running.
    pub async fn execute(&self, flow: &ComposedFlow) -> ExecutionReport {
        let timer = SpanTimer::start("flow_executor.execute");
        let execution_id = Uuid::new_v4();

        info!(
            execution_id = %execution_id,
            cluster = %self.location,
            sub_stages = flow.len(),
            "Executing flow"
        );
        self.event_sink.try_emit(
            "execution.started",
            Some(json!({
                "executionId": execution_id,
                "cluster": self.location.cluster,
                "subStages": flow.len(),
            })),
        );

        let mut state = RunState::default();
        let mut started: HashSet<&str> = HashSet::new();
        let mut running: FuturesUnordered<BoxFuture<'_, (&SubStageSpec, SubStageOutcome)>> =
            FuturesUnordered::new();

        loop {
            // Blocked and skipped outcomes can unlock further decisions, so
            // keep sweeping until nothing changes.
            let mut progressed = true;
            while progressed {
                progressed = false;
                for spec in flow.specs() {
                    if started.contains(spec.id.as_str()) || state.outcomes.contains_key(&spec.id) {
                        continue;
                    }
                    let decided = match readiness(spec, &state.outcomes) {
                        Readiness::Waiting => continue,
                        Readiness::Blocked(dep) => SubStageOutcome::blocked(dep),
                        Readiness::NotTriggered => {
                            SubStageOutcome::skip("no predecessor failed")
                        }
                        Readiness::Ready if self.cancellation.is_cancelled() => {
                            SubStageOutcome::cancel(
                                self.cancellation
                                    .reason()
                                    .unwrap_or_else(|| "cancelled".to_string()),
                            )
                        }
                        Readiness::Ready => {
                            started.insert(spec.id.as_str());
                            self.event_sink.try_emit(
                                "substage.started",
                                Some(json!({
                                    "executionId": execution_id,
                                    "id": spec.id,
                                    "stageType": spec.stage_type,
                                })),
                            );
                            let resolved = state.resolve_created(spec);
                            let own_groups = state.created_groups();
                            running.push(
                                async move { (spec, self.run_sub_stage(spec, resolved, own_groups).await) }
                                    .boxed(),
                            );
                            continue;
                        }
                    };
                    self.record(execution_id, spec, decided, &mut state);
                    progressed = true;
                }
            }

            let Some((spec, outcome)) = running.next().await else {
                break;
            };
            if spec.stage_type == SubStageType::Create && outcome.status == StageStatus::Ok {
                if let Some(name) = &outcome.server_group {
                    state.created.insert(spec.id.clone(), name.clone());
                }
            }
            self.record(execution_id, spec, outcome, &mut state);
        }

        let outcome = ExecutionReport::summarize(&state.outcomes);
        let duration_ms = timer.finish();
        info!(
            execution_id = %execution_id,
            outcome = ?outcome,
            duration_ms,
            "Flow execution finished"
        );
        self.event_sink.try_emit(
            "execution.completed",
            Some(json!({
                "executionId": execution_id,
                "outcome": outcome,
                "durationMs": duration_ms,
            })),
        );

        ExecutionReport {
            execution_id,
            outcome,
            outcomes: state.outcomes,
            completion_order: state.completion_order,
            duration_ms,
        }
    }

    fn record(
        &self,
        execution_id: Uuid,
        spec: &SubStageSpec,
        outcome: SubStageOutcome,
        state: &mut RunState,
    ) {
        let event_type = match outcome.status {
            StageStatus::Ok => "substage.completed",
            StageStatus::Fail => "substage.failed",
            StageStatus::Skip => "substage.skipped",
            StageStatus::Cancel => "substage.cancelled",
            StageStatus::Blocked => "substage.blocked",
        };
        self.event_sink.try_emit(
            event_type,
            Some(json!({
                "executionId": execution_id,
                "id": spec.id,
                "stageType": spec.stage_type,
                "status": outcome.status,
                "serverGroup": outcome.server_group,
            })),
        );
        state.completion_order.push(spec.id.clone());
        state.outcomes.insert(spec.id.clone(), outcome);
    }

    async fn run_sub_stage(
        &self,
        spec: &SubStageSpec,
        resolved: Option<String>,
        own_groups: Vec<String>,
    ) -> SubStageOutcome {
        match self.dispatch(spec, resolved, &own_groups).await {
            Ok(outcome) => {
                info!(
                    sub_stage = %spec.id,
                    stage_type = %spec.stage_type,
                    status = ?outcome.status,
                    server_group = ?outcome.server_group,
                    "Sub-stage finished"
                );
                outcome
            }
            Err(e) => {
                if e.is_health_check_timeout() {
                    warn!(sub_stage = %spec.id, error = %e, "Health check timed out");
                } else {
                    error!(sub_stage = %spec.id, stage_type = %spec.stage_type, error = %e, "Sub-stage failed");
                }
                SubStageOutcome::fail(e.to_string())
            }
        }
    }

    async fn dispatch(
        &self,
        spec: &SubStageSpec,
        resolved: Option<String>,
        own_groups: &[String],
    ) -> Result<SubStageOutcome, DriverError> {
        let location = &self.location;
        match spec.stage_type {
            SubStageType::Create => {
                let request = CreateServerGroup::from_spec(spec)?;
                let name = self.driver.create_server_group(location, &request).await?;
                Ok(SubStageOutcome::ok_for(name))
            }
            SubStageType::WaitHealthy => {
                let group = created_group(spec, resolved)?;
                let percent = spec
                    .param_u64(params::MIN_HEALTHY_PERCENT)
                    .and_then(|p| u8::try_from(p).ok())
                    .unwrap_or(DEFAULT_MIN_HEALTHY_PERCENT);
                let timeout = Duration::from_secs(
                    spec.param_u64(params::TIMEOUT_SECONDS)
                        .unwrap_or(DEFAULT_HEALTH_TIMEOUT_SECONDS),
                );
                self.driver
                    .wait_for_healthy(location, &group, percent, timeout)
                    .await?;
                Ok(SubStageOutcome::ok_for(group))
            }
            SubStageType::Enable => {
                let group = created_group(spec, resolved)?;
                self.driver.enable_server_group(location, &group).await?;
                Ok(SubStageOutcome::ok_for(group))
            }
            SubStageType::Disable => {
                let group = target_group(spec)?;
                self.driver.disable_server_group(location, group, None).await?;
                Ok(SubStageOutcome::ok_for(group))
            }
            SubStageType::ScheduledDisable => {
                let group = target_group(spec)?;
                let delay = spec.param_u64(params::DELAY_SECONDS).map(Duration::from_secs);
                self.driver.disable_server_group(location, group, delay).await?;
                Ok(SubStageOutcome::ok_for(group))
            }
            SubStageType::Destroy | SubStageType::Shrink => {
                self.destroy_existing(spec, own_groups).await
            }
            SubStageType::Rollback => match resolved {
                Some(group) => {
                    warn!(server_group = %group, "Rolling back new server group");
                    self.driver.destroy_server_group(location, &group).await?;
                    Ok(SubStageOutcome::ok_for(group))
                }
                None => Ok(SubStageOutcome::skip("no server group was created")),
            },
        }
    }

    /// Destroys a group captured in the snapshot, unless it has since gone
    /// away, been recreated under the same name, or belongs to this flow.
    async fn destroy_existing(
        &self,
        spec: &SubStageSpec,
        own_groups: &[String],
    ) -> Result<SubStageOutcome, DriverError> {
        let name = target_group(spec)?;
        if own_groups.iter().any(|g| g == name) {
            warn!(sub_stage = %spec.id, server_group = %name, "Refusing to destroy a group created by this flow");
            return Ok(SubStageOutcome::skip("target was created by this flow").on_server_group(name));
        }

        let recorded = spec
            .param_str(params::CREATED_AT)
            .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
            .ok_or_else(|| DriverError::malformed(&spec.id, "missing or invalid createdAt"))?;

        let location = &self.location;
        let current = self
            .provider
            .get_server_groups(&location.cluster, &location.account, &location.region)
            .await
            .map_err(|e| DriverError::operation_failed("revalidate", name, e.to_string()))?;

        match current.iter().find(|g| g.name == name) {
            None => {
                warn!(sub_stage = %spec.id, server_group = %name, "Race on destroy: target no longer exists");
                return Ok(SubStageOutcome::skip("race on destroy: target no longer exists")
                    .on_server_group(name));
            }
            Some(group) if group.created_at.timestamp_millis() != recorded.timestamp_millis() => {
                warn!(
                    sub_stage = %spec.id,
                    server_group = %name,
                    recorded = %recorded,
                    current = %group.created_at,
                    "Race on destroy: target was recreated after the snapshot"
                );
                return Ok(SubStageOutcome::skip(
                    "race on destroy: target was recreated after the snapshot",
                )
                .on_server_group(name));
            }
            Some(_) => {}
        }

        match self.driver.destroy_server_group(location, name).await {
            Ok(()) => Ok(SubStageOutcome::ok_for(name)),
            Err(DriverError::ServerGroupNotFound { .. }) => {
                warn!(sub_stage = %spec.id, server_group = %name, "Race on destroy: target vanished before destroy");
                Ok(SubStageOutcome::skip("race on destroy: target no longer exists").on_server_group(name))
            }
            Err(e) => Err(e),
        }
    }
}

impl std::fmt::Debug for FlowExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowExecutor")
            .field("location", &self.location)
            .field("cancellation", &self.cancellation)
            .finish_non_exhaustive()
    }
}

fn created_group(spec: &SubStageSpec, resolved: Option<String>) -> Result<String, DriverError> {
    resolved.ok_or_else(|| DriverError::malformed(&spec.id, "no created server group to act on"))
}

fn target_group(spec: &SubStageSpec) -> Result<&str, DriverError> {
    spec.param_str(params::SERVER_GROUP_NAME).ok_or_else(|| {
        DriverError::malformed(&spec.id, format!("missing '{}'", params::SERVER_GROUP_NAME))
    })
}
