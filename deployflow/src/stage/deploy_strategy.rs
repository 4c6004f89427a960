//! Builds the sub-stage graph for one deployment.

use crate::config::PlannerConfig;
use crate::context::{ClusterSnapshot, DeployRequest, StageContext};
use crate::errors::DeployflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::flow::ComposedFlow;
use crate::observability::SpanTimer;
use crate::providers::{ClusterLocation, ClusterStateProvider};
use crate::strategy::{FlowComposer, Strategy, StrategyRegistry};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Everything the planner decided for one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentPlan {
    /// The resolved strategy.
    pub strategy: Strategy,
    /// The context the flow was composed from.
    pub context: StageContext,
    /// The cluster state the flow was composed against.
    pub snapshot: ClusterSnapshot,
    /// The composed flow.
    pub flow: ComposedFlow,
}

impl DeploymentPlan {
    /// The cluster the plan targets.
    #[must_use]
    pub fn location(&self) -> ClusterLocation {
        ClusterLocation::new(self.context.cluster(), self.context.account(), self.context.region())
    }
}

/// Plans a deployment by reading the cluster once and composing the flow
/// for the requested strategy.
pub struct DeployStrategyStage {
    provider: Arc<dyn ClusterStateProvider>,
    config: PlannerConfig,
    event_sink: Arc<dyn EventSink>,
}

impl DeployStrategyStage {
    /// Creates a stage with the default configuration and no event sink.
    #[must_use]
    pub fn new(provider: Arc<dyn ClusterStateProvider>) -> Self {
        Self {
            provider,
            config: PlannerConfig::default(),
            event_sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the planner configuration.
    #[must_use]
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Returns the planner configuration.
    #[must_use]
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Resolves the request's strategy, falling back to the configured default.
    #[must_use]
    pub fn resolve_strategy(&self, request: &DeployRequest) -> Strategy {
        let key = request
            .strategy
            .as_deref()
            .unwrap_or(self.config.default_strategy.as_str());
        StrategyRegistry::resolve(Some(key))
    }

    /// Builds the sub-stage graph for `request`.
    ///
    /// # Errors
    ///
    /// - [`DeployflowError::InvalidRequest`] if the request is incomplete
    /// - [`DeployflowError::ClusterStateUnavailable`] if the cluster cannot be read
    /// - [`DeployflowError::FlowValidation`] if the composed graph is invalid
    pub async fn build_stage_graph(
        &self,
        request: &DeployRequest,
    ) -> Result<ComposedFlow, DeployflowError> {
        self.plan(request).await.map(|plan| plan.flow)
    }

    /// Like [`Self::build_stage_graph`], but also returns the inputs the
    /// flow was composed from.
    ///
    /// # Errors
    ///
    /// See [`Self::build_stage_graph`].
    pub async fn plan(&self, request: &DeployRequest) -> Result<DeploymentPlan, DeployflowError> {
        let timer = SpanTimer::start("deploy_strategy.plan");
        request.validate()?;

        let strategy = self.resolve_strategy(request);
        debug!(
            application = %request.application,
            cluster = %request.cluster,
            requested = ?request.strategy,
            strategy = %strategy,
            "Resolved deploy strategy"
        );

        let groups = match self
            .provider
            .get_server_groups(&request.cluster, &request.account, &request.region)
            .await
        {
            Ok(groups) => groups,
            Err(source) => {
                error!(
                    cluster = %request.cluster,
                    account = %request.account,
                    region = %request.region,
                    error = %source,
                    "Cluster state unavailable; aborting composition"
                );
                self.emit(
                    "flow.compose_failed",
                    json!({
                        "application": request.application,
                        "cluster": request.cluster,
                        "strategy": strategy,
                        "error": source.to_string(),
                    }),
                );
                return Err(DeployflowError::ClusterStateUnavailable {
                    cluster: request.cluster.clone(),
                    account: request.account.clone(),
                    region: request.region.clone(),
                    source,
                });
            }
        };

        let snapshot = ClusterSnapshot::new(groups);
        let context = StageContext::from_request(request, strategy.key(), &self.config);
        let flow = strategy.compose_flow(&context, &snapshot)?;

        let duration_ms = timer.finish();
        info!(
            application = %request.application,
            cluster = %request.cluster,
            strategy = %strategy,
            existing_groups = snapshot.len(),
            sub_stages = flow.len(),
            duration_ms,
            "Composed deploy flow"
        );
        self.emit(
            "flow.composed",
            json!({
                "application": request.application,
                "cluster": request.cluster,
                "strategy": strategy,
                "existingGroups": snapshot.len(),
                "subStages": flow.execution_order(),
                "fingerprint": flow.fingerprint(),
                "durationMs": duration_ms,
            }),
        );

        Ok(DeploymentPlan {
            strategy,
            context,
            snapshot,
            flow,
        })
    }

    fn emit(&self, event_type: &str, data: serde_json::Value) {
        if self.config.emit_events {
            self.event_sink.try_emit(event_type, Some(data));
        }
    }
}

impl std::fmt::Debug for DeployStrategyStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeployStrategyStage")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
