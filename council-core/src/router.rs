//! # Router (Cost Optimizer)
//!
//! Scores registry candidates for one subtask under the current
//! [`ExecutionMode`] and available-provider set, producing a
//! [`CandidateRanking`]. The weighted scoring table and its two reference
//! constants are a direct port of the original orchestration bridge's
//! `_prioritize_providers_for_subtask`: weights 0.40/0.25/0.15/0.10/0.10,
//! cost normalized against a reference max of `0.00003`/token, latency
//! normalized against a reference max of `5.0` seconds.

use crate::error::OrchestrationError;
use crate::models::{CandidateRanking, ExecutionMode, ModelDescriptor, RankedCandidate, Subtask};
use crate::registry::ModelRegistry;
use std::collections::HashSet;

pub const DEFAULT_REFERENCE_MAX_COST: f64 = 0.00003;
pub const DEFAULT_REFERENCE_MAX_LATENCY_SECS: f64 = 5.0;
pub const MAX_FALLBACKS: usize = 5;

#[derive(Debug, Clone, Copy)]
pub struct ReferenceValues {
    pub reference_max_cost: f64,
    pub reference_max_latency_secs: f64,
    pub cost_weight: f64,
    pub reliability_weight: f64,
}

impl ReferenceValues {
    /// Mode adjusts the reference values: Fast halves the latency
    /// reference (favoring snappier models more aggressively), BestQuality
    /// moves 0.10 of weight from cost to reliability.
    pub fn for_mode(mode: ExecutionMode) -> Self {
        let reference_max_latency_secs = match mode {
            ExecutionMode::Fast => DEFAULT_REFERENCE_MAX_LATENCY_SECS / 2.0,
            _ => DEFAULT_REFERENCE_MAX_LATENCY_SECS,
        };
        let (cost_weight, reliability_weight) = match mode {
            ExecutionMode::BestQuality => (0.15, 0.20),
            _ => (0.25, 0.10),
        };
        Self {
            reference_max_cost: DEFAULT_REFERENCE_MAX_COST,
            reference_max_latency_secs,
            cost_weight,
            reliability_weight,
        }
    }
}

pub struct Router {
    registry: ModelRegistry,
}

impl Router {
    pub fn new(registry: ModelRegistry) -> Self {
        Self { registry }
    }

    /// Scores and ranks registry candidates for `subtask`. `available` is
    /// the provider names currently deemed usable (spec §4.2/§4.11).
    pub fn rank(
        &self,
        subtask: &Subtask,
        mode: ExecutionMode,
        available: &HashSet<String>,
    ) -> Result<CandidateRanking, OrchestrationError> {
        let reference = ReferenceValues::for_mode(mode);
        let model_ids = self.registry.models_for_kind(subtask.kind);

        let mut scored: Vec<(f64, ModelDescriptor)> = model_ids
            .into_iter()
            .filter_map(|id| self.registry.lookup(&id))
            .filter(|descriptor| available.contains(&descriptor.provider))
            .map(|descriptor| (score(&descriptor, &reference), descriptor))
            .collect();

        if scored.is_empty() {
            return Err(OrchestrationError::NoCapableModel);
        }

        scored.sort_by(|(score_a, a), (score_b, b)| {
            score_b
                .partial_cmp(score_a)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    a.avg_token_cost()
                        .partial_cmp(&b.avg_token_cost())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.model_id.cmp(&b.model_id))
        });

        let candidates = scored
            .into_iter()
            .take(1 + MAX_FALLBACKS)
            .map(|(score, descriptor)| RankedCandidate {
                model_id: descriptor.model_id.clone(),
                provider: descriptor.provider.clone(),
                score,
                reason: format!(
                    "weighted score {:.1} (availability/cost/latency/capability/reliability)",
                    score
                ),
                est_cost: descriptor.avg_token_cost(),
                est_time_secs: descriptor.typical_latency_secs,
            })
            .collect();

        Ok(CandidateRanking { subtask_id: subtask.id, candidates })
    }
}

/// Scores one already-available-filtered candidate. Availability is always
/// 100 here because callers only pass descriptors whose provider already
/// passed the available-set filter (spec §4.5's filter step runs first).
fn score(descriptor: &ModelDescriptor, reference: &ReferenceValues) -> f64 {
    let availability_score = 100.0;
    let cost_score = (100.0 * (1.0 - descriptor.avg_token_cost() / reference.reference_max_cost))
        .clamp(0.0, 100.0);
    let latency_score = (100.0
        * (1.0 - descriptor.typical_latency_secs / reference.reference_max_latency_secs))
        .clamp(0.0, 100.0);
    let capability_score = (20.0 * descriptor.capabilities.len() as f64).min(100.0);
    let reliability_score = 100.0 * descriptor.reliability;

    let availability_weight = 0.40;
    let latency_weight = 0.15;
    let capability_weight = 0.10;

    availability_weight * availability_score
        + reference.cost_weight * cost_score
        + latency_weight * latency_score
        + capability_weight * capability_score
        + reference.reliability_weight * reliability_score
}
