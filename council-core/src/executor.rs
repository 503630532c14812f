//! # Executor
//!
//! Runs subtasks under bounded parallelism, invoking the chosen model via
//! the [`ProviderInvoker`] collaborator, enforcing a per-call timeout,
//! feeding the circuit breaker, and walking the fallback list on failure.
//! The fallback walk is grounded on the original bridge's
//! `hooked_execute`: on a primary failure it re-ranks remaining candidates
//! and tries the next.

use crate::cancel::CancelToken;
use crate::circuit_breaker::BreakerRegistry;
use crate::error::ProviderCallError;
use crate::health::ProviderHealthChecker;
use crate::models::{AgentResponse, CandidateRanking, SelfAssessment, SubtaskId};
use crate::progress::{envelope, ProgressEvent, SharedProgressSink};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;

/// Raw result of one successful provider call, before it's wrapped into an
/// [`AgentResponse`].
#[derive(Debug, Clone)]
pub struct InvocationOutcome {
    pub text: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub elapsed_ms: u64,
}

/// Collaborator consumed by the Executor (spec §6): call a named model with
/// a prompt, get text + usage counts back, or a categorized failure.
#[async_trait]
pub trait ProviderInvoker: Send + Sync {
    async fn invoke(
        &self,
        provider: &str,
        model_name: &str,
        prompt: &str,
        params: serde_json::Value,
    ) -> Result<InvocationOutcome, ProviderCallError>;
}

/// Estimates a confidence score for a successful invocation when the
/// invoker itself doesn't supply one. A light heuristic: longer, non-empty
/// output against a reasonably-sized prompt scores higher, capped at 0.97
/// so no automatic response claims near-certainty.
fn heuristic_confidence(outcome: &InvocationOutcome) -> f64 {
    if outcome.text.trim().is_empty() {
        return 0.0;
    }
    let length_component = (outcome.output_tokens as f64 / 256.0).min(1.0);
    (0.5 + 0.45 * length_component).min(0.97)
}

pub struct Executor {
    invoker: Arc<dyn ProviderInvoker>,
    breakers: BreakerRegistry,
    health: Option<Arc<ProviderHealthChecker>>,
    progress: SharedProgressSink,
    semaphore: Arc<Semaphore>,
}

impl Executor {
    pub fn new(
        invoker: Arc<dyn ProviderInvoker>,
        breakers: BreakerRegistry,
        progress: SharedProgressSink,
        parallelism: usize,
    ) -> Self {
        Self {
            invoker,
            breakers,
            health: None,
            progress,
            semaphore: Arc::new(Semaphore::new(parallelism.max(1))),
        }
    }

    /// Wires in the Health Checker so `Auth`/`BadRequest` attempt failures
    /// can mark the provider `Degraded` for health reporting (spec §6), in
    /// addition to the breaker feedback every failure already gets.
    pub fn with_health_checker(mut self, health: Arc<ProviderHealthChecker>) -> Self {
        self.health = Some(health);
        self
    }

    /// Runs every subtask's ranking concurrently, bounded by the
    /// configured semaphore, and returns one [`AgentResponse`] per subtask
    /// in completion order. `cancel`, if given, is checked at every
    /// candidate boundary and raced against every in-flight provider call
    /// so cancelling a request aborts outstanding work at its next await
    /// point instead of waiting out the per-call timeout.
    pub async fn execute_all(
        &self,
        rankings: Vec<(CandidateRanking, String, Duration)>,
        cancel: Option<CancelToken>,
    ) -> Vec<AgentResponse> {
        let futures = rankings.into_iter().map(|(ranking, subtask_content, timeout)| {
            let semaphore = self.semaphore.clone();
            let cancel = cancel.clone();
            async move {
                let _permit = semaphore.acquire().await.expect("semaphore never closed");
                self.run_one(ranking, subtask_content, timeout, cancel).await
            }
        });
        futures::future::join_all(futures).await
    }

    /// Runs one subtask's candidate list end to end: skip Open-breaker
    /// candidates, invoke, record success/failure, walk fallbacks on
    /// failure, emit exactly one `ExecutionProgress` per attempted
    /// candidate plus the terminal outcome.
    async fn run_one(
        &self,
        ranking: CandidateRanking,
        subtask_content: String,
        per_call_timeout: Duration,
        cancel: Option<CancelToken>,
    ) -> AgentResponse {
        let subtask_id = ranking.subtask_id;
        let mut primary_model_failed: Option<String> = None;
        let mut fallback_reason: Option<String> = None;
        let mut used_fallback = false;

        for candidate in &ranking.candidates {
            if let Some(cancel) = &cancel {
                if cancel.is_cancelled() {
                    return Self::cancelled_response(subtask_id, primary_model_failed);
                }
            }

            if !self.breakers.is_available(&candidate.provider).await {
                if primary_model_failed.is_none() {
                    primary_model_failed = Some(candidate.model_id.clone());
                }
                fallback_reason = Some("BreakerOpen".to_string());
                used_fallback = true;
                continue;
            }

            let started = Instant::now();
            let call = self.invoker.invoke(
                &candidate.provider,
                &candidate.model_id,
                &subtask_content,
                serde_json::Value::Null,
            );

            let outcome = match &cancel {
                Some(cancel) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            // Call outcome never observed: no breaker update either way.
                            return Self::cancelled_response(subtask_id, primary_model_failed);
                        }
                        result = tokio::time::timeout(per_call_timeout, call) => result,
                    }
                }
                None => tokio::time::timeout(per_call_timeout, call).await,
            };

            match outcome {
                Ok(Ok(invocation)) => {
                    self.breakers.record_success(&candidate.provider).await;
                    let confidence = heuristic_confidence(&invocation);
                    let exec_time_secs = started.elapsed().as_secs_f64();
                    let response = AgentResponse {
                        subtask_id,
                        model_id: candidate.model_id.clone(),
                        provider: candidate.provider.clone(),
                        content: invocation.text,
                        success: true,
                        self_assessment: SelfAssessment {
                            confidence,
                            risk: 0.0,
                            est_cost: candidate.est_cost
                                * (invocation.input_tokens + invocation.output_tokens) as f64,
                            tokens_in: invocation.input_tokens,
                            tokens_out: invocation.output_tokens,
                            exec_time_secs,
                        },
                        error: None,
                    };
                    self.progress
                        .emit(envelope(ProgressEvent::ExecutionProgress {
                            subtask_id,
                            model_id: candidate.model_id.clone(),
                            provider: candidate.provider.clone(),
                            success: true,
                            confidence,
                            cost: response.self_assessment.est_cost,
                            execution_time_secs: exec_time_secs,
                            used_fallback,
                            primary_model_failed: primary_model_failed.clone(),
                            fallback_reason: fallback_reason.clone(),
                            error_message: None,
                        }))
                        .await;
                    return response;
                }
                Ok(Err(call_error)) => {
                    if call_error.counts_as_breaker_failure() {
                        self.breakers.record_failure(&candidate.provider).await;
                    }
                    if call_error.degrades_provider() {
                        if let Some(health) = &self.health {
                            health.mark_degraded(&candidate.provider, call_error.to_string());
                        }
                    }
                    if primary_model_failed.is_none() {
                        primary_model_failed = Some(candidate.model_id.clone());
                    }
                    fallback_reason = Some(call_error.to_string());
                    used_fallback = true;
                    self.progress
                        .emit(envelope(ProgressEvent::ExecutionProgress {
                            subtask_id,
                            model_id: candidate.model_id.clone(),
                            provider: candidate.provider.clone(),
                            success: false,
                            confidence: 0.0,
                            cost: 0.0,
                            execution_time_secs: started.elapsed().as_secs_f64(),
                            used_fallback: true,
                            primary_model_failed: primary_model_failed.clone(),
                            fallback_reason: fallback_reason.clone(),
                            error_message: Some(call_error.to_string()),
                        }))
                        .await;
                    continue;
                }
                Err(_elapsed) => {
                    self.breakers.record_failure(&candidate.provider).await;
                    if primary_model_failed.is_none() {
                        primary_model_failed = Some(candidate.model_id.clone());
                    }
                    fallback_reason = Some("Timeout".to_string());
                    used_fallback = true;
                    self.progress
                        .emit(envelope(ProgressEvent::ExecutionProgress {
                            subtask_id,
                            model_id: candidate.model_id.clone(),
                            provider: candidate.provider.clone(),
                            success: false,
                            confidence: 0.0,
                            cost: 0.0,
                            execution_time_secs: started.elapsed().as_secs_f64(),
                            used_fallback: true,
                            primary_model_failed: primary_model_failed.clone(),
                            fallback_reason: fallback_reason.clone(),
                            error_message: Some("per-call timeout exceeded".to_string()),
                        }))
                        .await;
                    continue;
                }
            }
        }

        // Every candidate exhausted.
        let response = AgentResponse {
            subtask_id,
            model_id: primary_model_failed.clone().unwrap_or_default(),
            provider: String::new(),
            content: String::new(),
            success: false,
            self_assessment: SelfAssessment {
                confidence: 0.0,
                risk: 1.0,
                est_cost: 0.0,
                tokens_in: 0,
                tokens_out: 0,
                exec_time_secs: 0.0,
            },
            error: Some(
                fallback_reason.clone().unwrap_or_else(|| "all candidates exhausted".to_string()),
            ),
        };
        self.progress
            .emit(envelope(ProgressEvent::ExecutionProgress {
                subtask_id,
                model_id: String::new(),
                provider: String::new(),
                success: false,
                confidence: 0.0,
                cost: 0.0,
                execution_time_secs: 0.0,
                used_fallback,
                primary_model_failed,
                fallback_reason,
                error_message: response.error.clone(),
            }))
            .await;
        response
    }

    /// Built when a cancellation token fires mid-walk. No breaker or health
    /// state is touched here: whatever candidate was in flight had its
    /// outcome never observed, so neither a success nor a failure is
    /// recorded for it (spec §5).
    fn cancelled_response(subtask_id: SubtaskId, primary_model_failed: Option<String>) -> AgentResponse {
        AgentResponse {
            subtask_id,
            model_id: primary_model_failed.unwrap_or_default(),
            provider: String::new(),
            content: String::new(),
            success: false,
            self_assessment: SelfAssessment {
                confidence: 0.0,
                risk: 1.0,
                est_cost: 0.0,
                tokens_in: 0,
                tokens_out: 0,
                exec_time_secs: 0.0,
            },
            error: Some("cancelled".to_string()),
        }
    }
}
