//! # Arbiter
//!
//! Resolves conflicting [`AgentResponse`]s for the same subtask — this only
//! happens when a subtask was deliberately dispatched to more than one
//! model (spec §9 leaves the decision of *whether* to do that to the
//! embedder; the Arbiter only resolves the outcome once it happens).
//! Default tie-break order: highest confidence, then lowest risk, then
//! lowest cost, then lexicographically smallest model id — fully
//! deterministic so two runs over the same inputs always agree.

use crate::models::{AgentResponse, SelfAssessment, SubtaskId};
use crate::progress::{ArbitrationDecisionEntry, ConflictingResultEntry};
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct Arbitration {
    pub chosen: HashMap<SubtaskId, AgentResponse>,
    pub conflicts_detected: usize,
    pub decisions: Vec<ArbitrationDecisionEntry>,
    pub conflicting_results: Vec<ConflictingResultEntry>,
}

#[async_trait]
pub trait Arbiter: Send + Sync {
    async fn arbitrate(&self, responses: Vec<AgentResponse>) -> Arbitration;
}

pub struct DefaultArbiter;

fn rank_key(assessment: &SelfAssessment) -> (i64, i64, i64) {
    // Sort descending by confidence, ascending by risk, ascending by cost.
    // Multiply by a large factor and negate/truncate to get total orderable
    // integers out of floats without pulling in an ordered-float crate.
    let confidence = -(assessment.confidence * 1_000_000.0) as i64;
    let risk = (assessment.risk * 1_000_000.0) as i64;
    let cost = (assessment.est_cost * 1_000_000_000.0) as i64;
    (confidence, risk, cost)
}

#[async_trait]
impl Arbiter for DefaultArbiter {
    async fn arbitrate(&self, responses: Vec<AgentResponse>) -> Arbitration {
        let mut by_subtask: HashMap<SubtaskId, Vec<AgentResponse>> = HashMap::new();
        for response in responses {
            by_subtask.entry(response.subtask_id).or_default().push(response);
        }

        let mut chosen = HashMap::new();
        let mut conflicts_detected = 0usize;
        let mut decisions = Vec::new();
        let mut conflicting_results = Vec::new();

        for (subtask_id, mut candidates) in by_subtask {
            let successful_count = candidates.iter().filter(|r| r.success).count();
            let had_multiple = candidates.len() > 1;
            if successful_count > 1 {
                conflicts_detected += 1;
            }

            candidates.sort_by(|a, b| {
                let (key_a, key_b) = match (a.success, b.success) {
                    (true, false) => return Ordering::Less,
                    (false, true) => return Ordering::Greater,
                    _ => (rank_key(&a.self_assessment), rank_key(&b.self_assessment)),
                };
                key_a.cmp(&key_b).then_with(|| a.model_id.cmp(&b.model_id))
            });

            let mut candidates = candidates.into_iter();
            if let Some(winner) = candidates.next() {
                decisions.push(ArbitrationDecisionEntry {
                    chosen_response_id: format!("{}:{}", subtask_id, winner.model_id),
                    reasoning: if successful_count > 1 {
                        "highest confidence among multiple successful responses".to_string()
                    } else {
                        "only viable candidate".to_string()
                    },
                    confidence: winner.self_assessment.confidence,
                });
                if had_multiple {
                    for loser in candidates {
                        conflicting_results.push(ConflictingResultEntry {
                            subtask_id,
                            response_id: format!("{}:{}", subtask_id, loser.model_id),
                            confidence: loser.self_assessment.confidence,
                        });
                    }
                }
                chosen.insert(subtask_id, winner);
            }
        }

        Arbitration { chosen, conflicts_detected, decisions, conflicting_results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(subtask_id: SubtaskId, model_id: &str, confidence: f64, risk: f64) -> AgentResponse {
        AgentResponse {
            subtask_id,
            model_id: model_id.to_string(),
            provider: "test-provider".to_string(),
            content: "answer".to_string(),
            success: true,
            self_assessment: SelfAssessment {
                confidence,
                risk,
                est_cost: 0.001,
                tokens_in: 10,
                tokens_out: 20,
                exec_time_secs: 1.0,
            },
            error: None,
        }
    }

    #[tokio::test]
    async fn single_response_per_subtask_has_no_conflict() {
        let subtask_id = SubtaskId::new();
        let arbitration =
            DefaultArbiter.arbitrate(vec![response(subtask_id, "m1", 0.8, 0.1)]).await;
        assert_eq!(arbitration.conflicts_detected, 0);
        assert_eq!(arbitration.chosen.len(), 1);
    }

    #[tokio::test]
    async fn highest_confidence_wins_among_duplicates() {
        let subtask_id = SubtaskId::new();
        let arbitration = DefaultArbiter
            .arbitrate(vec![
                response(subtask_id, "m1", 0.6, 0.1),
                response(subtask_id, "m2", 0.9, 0.1),
            ])
            .await;
        assert_eq!(arbitration.conflicts_detected, 1);
        assert_eq!(arbitration.chosen.get(&subtask_id).unwrap().model_id, "m2");
    }

    #[tokio::test]
    async fn losing_candidates_are_retained_as_conflicting_results() {
        let subtask_id = SubtaskId::new();
        let arbitration = DefaultArbiter
            .arbitrate(vec![
                response(subtask_id, "m1", 0.6, 0.1),
                response(subtask_id, "m2", 0.9, 0.1),
            ])
            .await;
        assert_eq!(arbitration.conflicting_results.len(), 1);
        assert_eq!(arbitration.conflicting_results[0].subtask_id, subtask_id);
        assert!((arbitration.conflicting_results[0].confidence - 0.6).abs() < 1e-9);
    }

    #[tokio::test]
    async fn tie_on_confidence_breaks_on_lower_risk() {
        let subtask_id = SubtaskId::new();
        let arbitration = DefaultArbiter
            .arbitrate(vec![
                response(subtask_id, "m1", 0.8, 0.5),
                response(subtask_id, "m2", 0.8, 0.1),
            ])
            .await;
        assert_eq!(arbitration.chosen.get(&subtask_id).unwrap().model_id, "m2");
    }

    #[tokio::test]
    async fn a_successful_response_always_beats_a_failed_one() {
        let subtask_id = SubtaskId::new();
        let mut failed = response(subtask_id, "m1", 0.99, 0.0);
        failed.success = false;
        failed.error = Some("boom".to_string());
        let arbitration = DefaultArbiter
            .arbitrate(vec![failed, response(subtask_id, "m2", 0.1, 0.9)])
            .await;
        assert_eq!(arbitration.chosen.get(&subtask_id).unwrap().model_id, "m2");
    }

    #[tokio::test]
    async fn independent_subtasks_never_conflict_with_each_other() {
        let first = SubtaskId::new();
        let second = SubtaskId::new();
        let arbitration = DefaultArbiter
            .arbitrate(vec![response(first, "m1", 0.8, 0.1), response(second, "m2", 0.6, 0.2)])
            .await;
        assert_eq!(arbitration.conflicts_detected, 0);
        assert_eq!(arbitration.chosen.len(), 2);
    }
}
