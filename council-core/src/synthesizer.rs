//! # Synthesizer
//!
//! Merges the Arbiter's winning [`AgentResponse`] per subtask into one
//! [`FinalResponse`]. The default strategy is deterministic: concatenate in
//! subtask submission order, separated by blank lines. Spec §4.8 leaves the
//! merge strategy itself open (a model-assisted rewrite is a reasonable
//! alternative), so `Synthesizer` is a trait and this is just the shipped
//! default.

use crate::models::{
    AgentResponse, CostBreakdown, CostEntry, ExecutionMode, FinalResponse, SelectionLogEntry,
    Subtask, SubtaskId,
};
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(
        &self,
        subtasks: &[Subtask],
        responses: &HashMap<SubtaskId, AgentResponse>,
        mode: ExecutionMode,
        selection_log: Vec<SelectionLogEntry>,
    ) -> FinalResponse;
}

pub struct DefaultSynthesizer;

#[async_trait]
impl Synthesizer for DefaultSynthesizer {
    async fn synthesize(
        &self,
        subtasks: &[Subtask],
        responses: &HashMap<SubtaskId, AgentResponse>,
        mode: ExecutionMode,
        selection_log: Vec<SelectionLogEntry>,
    ) -> FinalResponse {
        let mut ordered: Vec<&Subtask> = subtasks.iter().collect();
        ordered.sort_by_key(|subtask| subtask.priority);

        let mut sections = Vec::new();
        let mut models_used: Vec<String> = Vec::new();
        let mut confidences = Vec::new();
        let mut per_model_cost: HashMap<String, CostEntry> = HashMap::new();
        let mut per_provider_cost: HashMap<String, CostEntry> = HashMap::new();
        let mut total_cost = 0.0;
        let mut total_exec_time = 0.0;
        let mut any_success = false;
        let mut failures = Vec::new();

        for subtask in &ordered {
            let Some(response) = responses.get(&subtask.id) else {
                failures.push(format!("subtask {} produced no response", subtask.id));
                continue;
            };
            total_exec_time += response.self_assessment.exec_time_secs;
            if !response.success {
                failures.push(
                    response
                        .error
                        .clone()
                        .unwrap_or_else(|| format!("subtask {} failed", subtask.id)),
                );
                continue;
            }
            any_success = true;
            sections.push(response.content.clone());
            if !models_used.contains(&response.model_id) {
                models_used.push(response.model_id.clone());
            }
            confidences.push((response.self_assessment.confidence, response.content.len()));
            total_cost += response.self_assessment.est_cost;

            let entry = per_model_cost.entry(response.model_id.clone()).or_insert_with(|| {
                CostEntry {
                    model_id: response.model_id.clone(),
                    provider: response.provider.clone(),
                    cost: 0.0,
                    tokens_in: 0,
                    tokens_out: 0,
                }
            });
            entry.cost += response.self_assessment.est_cost;
            entry.tokens_in += response.self_assessment.tokens_in;
            entry.tokens_out += response.self_assessment.tokens_out;

            let provider_entry =
                per_provider_cost.entry(response.provider.clone()).or_insert_with(|| CostEntry {
                    model_id: String::new(),
                    provider: response.provider.clone(),
                    cost: 0.0,
                    tokens_in: 0,
                    tokens_out: 0,
                });
            provider_entry.cost += response.self_assessment.est_cost;
            provider_entry.tokens_in += response.self_assessment.tokens_in;
            provider_entry.tokens_out += response.self_assessment.tokens_out;
        }

        let overall_confidence = if confidences.is_empty() {
            0.0
        } else if mode == ExecutionMode::BestQuality {
            confidences.iter().map(|(confidence, _)| *confidence).fold(f64::MAX, f64::min)
        } else {
            let total_len: usize = confidences.iter().map(|(_, len)| len).sum::<usize>().max(1);
            confidences
                .iter()
                .map(|(confidence, len)| confidence * (*len as f64 / total_len as f64))
                .sum()
        };

        let per_model_cost: Vec<CostEntry> = per_model_cost.into_values().collect();
        let per_provider_cost: Vec<CostEntry> = per_provider_cost.into_values().collect();
        let cost_breakdown = CostBreakdown {
            total_cost,
            per_model_cost,
            per_provider_cost,
            execution_time_secs: total_exec_time,
        };

        // BestQuality requires every subtask to succeed; a partial failure
        // in any other mode still reports success from the surviving subset.
        let success = any_success && !(mode == ExecutionMode::BestQuality && !failures.is_empty());

        FinalResponse {
            content: sections.join("\n\n"),
            overall_confidence,
            models_used,
            cost_breakdown,
            provider_selection_log: selection_log,
            metadata: serde_json::json!({ "subtask_count": subtasks.len() }),
            success,
            error_message: if failures.is_empty() { None } else { Some(failures.join("; ")) },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RequestId, SelfAssessment, TaskKind};

    fn subtask(priority: u8) -> Subtask {
        Subtask {
            id: SubtaskId::new(),
            parent_id: RequestId::new(),
            content: "content".into(),
            kind: TaskKind::Reasoning,
            priority,
            risk: 0.1,
            accuracy_requirement: 0.8,
        }
    }

    fn success(subtask_id: SubtaskId, model_id: &str, content: &str, confidence: f64) -> AgentResponse {
        AgentResponse {
            subtask_id,
            model_id: model_id.to_string(),
            provider: "test-provider".to_string(),
            content: content.to_string(),
            success: true,
            self_assessment: SelfAssessment {
                confidence,
                risk: 0.1,
                est_cost: 0.001,
                tokens_in: 5,
                tokens_out: 5,
                exec_time_secs: 0.5,
            },
            error: None,
        }
    }

    #[tokio::test]
    async fn concatenates_subtasks_in_priority_order() {
        let first = subtask(0);
        let second = subtask(1);
        let mut responses = HashMap::new();
        responses.insert(first.id, success(first.id, "m1", "first", 0.8));
        responses.insert(second.id, success(second.id, "m1", "second", 0.8));

        let final_response = DefaultSynthesizer
            .synthesize(&[second.clone(), first.clone()], &responses, ExecutionMode::Balanced, vec![])
            .await;
        assert_eq!(final_response.content, "first\n\nsecond");
    }

    #[tokio::test]
    async fn best_quality_confidence_is_the_minimum_of_contributors() {
        let first = subtask(0);
        let second = subtask(1);
        let mut responses = HashMap::new();
        responses.insert(first.id, success(first.id, "m1", "first", 0.9));
        responses.insert(second.id, success(second.id, "m2", "second", 0.4));

        let final_response = DefaultSynthesizer
            .synthesize(&[first, second], &responses, ExecutionMode::BestQuality, vec![])
            .await;
        assert!((final_response.overall_confidence - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn missing_response_is_recorded_as_a_failure_without_panicking() {
        let only = subtask(0);
        let final_response =
            DefaultSynthesizer.synthesize(&[only], &HashMap::new(), ExecutionMode::Fast, vec![]).await;
        assert!(!final_response.success);
        assert!(final_response.error_message.is_some());
    }

    #[tokio::test]
    async fn best_quality_partial_failure_reports_overall_failure() {
        let first = subtask(0);
        let second = subtask(1);
        let mut responses = HashMap::new();
        responses.insert(first.id, success(first.id, "m1", "first", 0.9));
        // second has no response at all, i.e. failed.

        let final_response = DefaultSynthesizer
            .synthesize(&[first, second], &responses, ExecutionMode::BestQuality, vec![])
            .await;
        assert!(!final_response.success);
        assert!(final_response.error_message.is_some());
    }

    #[tokio::test]
    async fn balanced_mode_partial_failure_still_reports_success() {
        let first = subtask(0);
        let second = subtask(1);
        let mut responses = HashMap::new();
        responses.insert(first.id, success(first.id, "m1", "first", 0.9));
        // second has no response at all, i.e. failed.

        let final_response = DefaultSynthesizer
            .synthesize(&[first, second], &responses, ExecutionMode::Balanced, vec![])
            .await;
        assert!(final_response.success);
        assert!(final_response.error_message.is_some());
    }

    #[tokio::test]
    async fn models_used_is_deduplicated() {
        let first = subtask(0);
        let second = subtask(1);
        let mut responses = HashMap::new();
        responses.insert(first.id, success(first.id, "m1", "a", 0.8));
        responses.insert(second.id, success(second.id, "m1", "b", 0.8));

        let final_response = DefaultSynthesizer
            .synthesize(&[first, second], &responses, ExecutionMode::Balanced, vec![])
            .await;
        assert_eq!(final_response.models_used, vec!["m1".to_string()]);
    }

    #[tokio::test]
    async fn per_model_and_per_provider_costs_sum_to_total() {
        let first = subtask(0);
        let second = subtask(1);
        let mut first_response = success(first.id, "m1", "a", 0.8);
        first_response.provider = "groq".to_string();
        let mut second_response = success(second.id, "m2", "b", 0.8);
        second_response.provider = "together".to_string();
        let mut responses = HashMap::new();
        responses.insert(first.id, first_response);
        responses.insert(second.id, second_response);

        let final_response = DefaultSynthesizer
            .synthesize(&[first, second], &responses, ExecutionMode::Balanced, vec![])
            .await;
        let per_model_sum: f64 = final_response.cost_breakdown.per_model_cost.iter().map(|e| e.cost).sum();
        let per_provider_sum: f64 =
            final_response.cost_breakdown.per_provider_cost.iter().map(|e| e.cost).sum();
        assert!((per_model_sum - final_response.cost_breakdown.total_cost).abs() < 1e-6);
        assert!((per_provider_sum - final_response.cost_breakdown.total_cost).abs() < 1e-6);
        assert_eq!(final_response.cost_breakdown.per_provider_cost.len(), 2);
    }
}
