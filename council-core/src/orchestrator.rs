//! # Orchestrator
//!
//! Wires every other component into the end-to-end pipeline described by
//! spec §4.9: Analyzer → Router (per subtask) → Executor → Arbiter →
//! Synthesizer, with a [`crate::progress::ProgressBus`] broadcasting each
//! phase's outcome and a single overall deadline bounding the whole walk.

use crate::analyzer::Analyzer;
use crate::arbiter::Arbiter;
use crate::cancel::CancelToken;
use crate::circuit_breaker::BreakerRegistry;
use crate::config::OrchestratorConfig;
use crate::cost::{CostRecorder, ProviderCostEntry};
use crate::error::OrchestrationError;
use crate::executor::{Executor, ProviderInvoker};
use crate::health::ProviderHealthChecker;
use crate::models::{CostEntry, FinalResponse, ProviderUsageSummary, Request, RequestId, SelectionLogEntry};
use crate::progress::{
    envelope, ArbitrationDecisionEntry, ConflictingResultEntry, ProgressBus, ProgressEvent,
    ProgressReceiver, RoutingAssignment, SynthesisStage,
};
use crate::registry::ModelRegistry;
use crate::router::Router;
use crate::synthesizer::Synthesizer;
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

pub struct Orchestrator {
    registry: ModelRegistry,
    breakers: BreakerRegistry,
    health: Arc<ProviderHealthChecker>,
    analyzer: Arc<dyn Analyzer>,
    arbiter: Arc<dyn Arbiter>,
    synthesizer: Arc<dyn Synthesizer>,
    invoker: Arc<dyn ProviderInvoker>,
    cost_recorder: Arc<dyn CostRecorder>,
    in_flight: DashMap<RequestId, CancelToken>,
}

impl Orchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: ModelRegistry,
        breakers: BreakerRegistry,
        health: Arc<ProviderHealthChecker>,
        analyzer: Arc<dyn Analyzer>,
        arbiter: Arc<dyn Arbiter>,
        synthesizer: Arc<dyn Synthesizer>,
        invoker: Arc<dyn ProviderInvoker>,
        cost_recorder: Arc<dyn CostRecorder>,
    ) -> Self {
        Self {
            registry,
            breakers,
            health,
            analyzer,
            arbiter,
            synthesizer,
            invoker,
            cost_recorder,
            in_flight: DashMap::new(),
        }
    }

    /// Starts processing `request` in the background and returns a
    /// subscription to its progress bus immediately; the terminal
    /// `FinalResponse`/`Error` event arrives on that same stream. Spec §6
    /// treats the HTTP submission surface as an external collaborator, so
    /// this is the seam a gateway wraps in `POST /requests`.
    pub async fn submit(self: &Arc<Self>, request: Request) -> ProgressReceiver {
        let bus = Arc::new(ProgressBus::new(request.id));
        let receiver = bus.subscribe().await;
        let cancel = CancelToken::new();
        self.in_flight.insert(request.id, cancel.clone());
        let orchestrator = self.clone();
        tokio::spawn(async move {
            orchestrator.run(request, bus, cancel).await;
        });
        receiver
    }

    /// Requests cancellation of an in-flight request by id. Returns `true`
    /// if a matching request was found and signalled, `false` if it had
    /// already finished (or never existed).
    pub fn cancel(&self, request_id: RequestId) -> bool {
        match self.in_flight.get(&request_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Drives one request through the full pipeline, always terminating
    /// the bus with exactly one `FinalResponse` or `Error` event.
    async fn run(&self, request: Request, bus: Arc<ProgressBus>, cancel: CancelToken) {
        let config = OrchestratorConfig::for_mode(request.mode);
        let request_id = request.id;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Ok(Err(OrchestrationError::Cancelled)),
            result = tokio::time::timeout(
                config.overall_timeout,
                self.run_inner(&request, &bus, &config, &cancel),
            ) => result,
        };
        self.in_flight.remove(&request_id);

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => self.emit_error(&bus, &error).await,
            Err(_elapsed) => self.emit_error(&bus, &OrchestrationError::DeadlineExceeded).await,
        }
    }

    async fn emit_error(&self, bus: &Arc<ProgressBus>, error: &OrchestrationError) {
        use crate::progress::ProgressSink;
        bus.emit(envelope(ProgressEvent::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        }))
        .await;
    }

    async fn run_inner(
        &self,
        request: &Request,
        bus: &Arc<ProgressBus>,
        config: &OrchestratorConfig,
        cancel: &CancelToken,
    ) -> Result<(), OrchestrationError> {
        use crate::progress::ProgressSink;

        bus.emit(envelope(ProgressEvent::ProcessingStarted)).await;

        let available: HashSet<String> =
            self.health.available_providers(Some(cancel)).await.into_iter().collect();
        if available.is_empty() {
            return Err(OrchestrationError::NoProvidersAvailable);
        }

        let analysis = tokio::time::timeout(
            config.analysis_timeout,
            self.analyzer.analyze(request.id, &request.content, request.mode),
        )
        .await
        .map_err(|_| OrchestrationError::Timeout("analysis".to_string()))?;

        bus.emit(envelope(ProgressEvent::AnalysisComplete {
            intent: analysis.intent,
            complexity: analysis.complexity,
            degraded: analysis.degraded,
        }))
        .await;

        let router = Router::new(self.registry.clone());
        let mut rankings = Vec::new();
        let mut assignments = Vec::new();
        let mut selection_log = Vec::new();

        for subtask in &analysis.subtasks {
            let ranking = router.rank(subtask, request.mode, &available)?;
            if let Some(primary) = ranking.primary() {
                assignments.push(RoutingAssignment {
                    subtask_id: subtask.id,
                    task_kind: format!("{:?}", subtask.kind),
                    model_id: primary.model_id.clone(),
                    provider: primary.provider.clone(),
                    reason: primary.reason.clone(),
                    est_cost: primary.est_cost,
                    est_time_secs: primary.est_time_secs,
                    alternatives_considered: ranking.fallbacks().len(),
                });
                selection_log.push(SelectionLogEntry {
                    subtask_id: subtask.id,
                    chosen_model: primary.model_id.clone(),
                    provider: primary.provider.clone(),
                    reason: primary.reason.clone(),
                    alternatives: ranking.fallbacks().iter().map(|c| c.model_id.clone()).collect(),
                    ts: Utc::now(),
                });
            }
            rankings.push((ranking, subtask.content.clone(), config.per_call_timeout));
        }

        if assignments.is_empty() {
            return Err(OrchestrationError::NoCapableModel);
        }

        bus.emit(envelope(ProgressEvent::RoutingComplete {
            assignments,
            total_subtasks: analysis.subtasks.len(),
        }))
        .await;

        let executor = Executor::new(
            self.invoker.clone(),
            self.breakers.clone(),
            bus.clone(),
            config.parallelism,
        )
        .with_health_checker(self.health.clone());
        let responses = executor.execute_all(rankings, Some(cancel.clone())).await;

        let arbitration = self.arbiter.arbitrate(responses).await;
        bus.emit(envelope(ProgressEvent::ArbitrationDecision {
            conflicts_detected: arbitration.conflicts_detected,
            decisions: arbitration
                .decisions
                .iter()
                .cloned()
                .collect::<Vec<ArbitrationDecisionEntry>>(),
            conflicting_results: arbitration
                .conflicting_results
                .iter()
                .cloned()
                .collect::<Vec<ConflictingResultEntry>>(),
        }))
        .await;

        bus.emit(envelope(ProgressEvent::SynthesisProgress { stage: SynthesisStage::Started }))
            .await;

        let final_response = tokio::time::timeout(
            config.synthesis_timeout,
            self.synthesizer.synthesize(
                &analysis.subtasks,
                &arbitration.chosen,
                request.mode,
                selection_log.clone(),
            ),
        )
        .await
        .map_err(|_| OrchestrationError::Timeout("synthesis".to_string()))?;

        bus.emit(envelope(ProgressEvent::SynthesisProgress { stage: SynthesisStage::Complete }))
            .await;

        self.record_costs(request.id, &final_response).await;

        let usage_summary: Vec<ProviderUsageSummary> =
            final_response.cost_breakdown.per_provider_cost.iter().map(ProviderUsageSummary::from).collect();
        bus.emit(envelope(ProgressEvent::FinalResponse {
            response: Box::new(final_response),
            provider_selection_log: selection_log,
            provider_usage_summary: usage_summary,
        }))
        .await;

        Ok(())
    }

    async fn record_costs(&self, request_id: RequestId, final_response: &FinalResponse) {
        let entries: Vec<ProviderCostEntry> = final_response
            .cost_breakdown
            .per_model_cost
            .iter()
            .map(|entry: &CostEntry| ProviderCostEntry {
                model: entry.model_id.clone(),
                provider: entry.provider.clone(),
                subtask_count: 1,
                total_cost: entry.cost,
                tokens_in: entry.tokens_in,
                tokens_out: entry.tokens_out,
            })
            .collect();
        self.cost_recorder.record(request_id, entries).await;
    }
}
