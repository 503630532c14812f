//! # Demo Collaborators
//!
//! The orchestration core treats provider HTTP clients and cost persistence
//! as external collaborators (spec §1/§6); this crate is a thin HTTP
//! surface, not a provider SDK, so it ships deterministic stand-ins instead
//! of real network clients. `DemoProviderInvoker` lets the whole pipeline
//! run end to end without API keys; `InMemoryCostRecorder` gives the
//! `/admin/costs`-style introspection a real backing without a database,
//! grounded on the original cost tracker's per-provider aggregation shape
//! (`provider_cost_tracker.py`) but `DashMap`-backed instead of SQLite.

use async_trait::async_trait;
use council_core::cost::{CostRecorder, ProviderCostEntry};
use council_core::error::ProviderCallError;
use council_core::executor::{InvocationOutcome, ProviderInvoker};
use council_core::models::RequestId;
use dashmap::DashMap;

/// Synthesizes a plausible-looking answer for any (provider, model) pair
/// without making a network call. Deterministic: the same prompt always
/// produces the same output, which keeps the orchestrator's tests and the
/// gateway's smoke tests reproducible.
pub struct DemoProviderInvoker;

#[async_trait]
impl ProviderInvoker for DemoProviderInvoker {
    async fn invoke(
        &self,
        provider: &str,
        model_name: &str,
        prompt: &str,
        _params: serde_json::Value,
    ) -> Result<InvocationOutcome, ProviderCallError> {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let text = format!("[{provider}/{model_name} demo response] {prompt}");
        let input_tokens = (prompt.split_whitespace().count() as u32).max(1);
        let output_tokens = (text.split_whitespace().count() as u32).max(1);
        Ok(InvocationOutcome { text, input_tokens, output_tokens, elapsed_ms: 20 })
    }
}

#[derive(Debug, Clone, Default)]
struct ProviderTotals {
    subtask_count: u32,
    total_cost: f64,
    tokens_in: u32,
    tokens_out: u32,
}

/// Keeps a running per-(model, provider) cost ledger for the lifetime of
/// the process. Not persisted across restarts — spec §1 puts durable
/// persistence out of scope for this core.
#[derive(Default)]
pub struct InMemoryCostRecorder {
    totals: DashMap<(String, String), ProviderTotals>,
}

impl InMemoryCostRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<ProviderCostEntry> {
        self.totals
            .iter()
            .map(|entry| {
                let (model, provider) = entry.key().clone();
                let totals = entry.value();
                ProviderCostEntry {
                    model,
                    provider,
                    subtask_count: totals.subtask_count,
                    total_cost: totals.total_cost,
                    tokens_in: totals.tokens_in,
                    tokens_out: totals.tokens_out,
                }
            })
            .collect()
    }
}

#[async_trait]
impl CostRecorder for InMemoryCostRecorder {
    async fn record(&self, _request_id: RequestId, entries: Vec<ProviderCostEntry>) {
        for entry in entries {
            let mut totals =
                self.totals.entry((entry.model, entry.provider)).or_insert_with(ProviderTotals::default);
            totals.subtask_count += entry.subtask_count;
            totals.total_cost += entry.total_cost;
            totals.tokens_in += entry.tokens_in;
            totals.tokens_out += entry.tokens_out;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invoker_echoes_prompt_deterministically() {
        let invoker = DemoProviderInvoker;
        let first =
            invoker.invoke("groq", "llama-3.1-8b-instant", "hello there", serde_json::Value::Null).await.unwrap();
        let second =
            invoker.invoke("groq", "llama-3.1-8b-instant", "hello there", serde_json::Value::Null).await.unwrap();
        assert_eq!(first.text, second.text);
        assert!(first.text.contains("hello there"));
    }

    #[tokio::test]
    async fn cost_recorder_accumulates_across_calls() {
        let recorder = InMemoryCostRecorder::new();
        let entry = ProviderCostEntry {
            model: "m1".into(),
            provider: "groq".into(),
            subtask_count: 1,
            total_cost: 0.01,
            tokens_in: 10,
            tokens_out: 20,
        };
        recorder.record(RequestId::new(), vec![entry.clone()]).await;
        recorder.record(RequestId::new(), vec![entry]).await;

        let snapshot = recorder.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].subtask_count, 2);
        assert!((snapshot[0].total_cost - 0.02).abs() < 1e-9);
    }
}
