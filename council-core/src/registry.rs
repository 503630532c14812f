//! # Model Registry
//!
//! Read-only catalog mapping a stable `model_id` to a [`ModelDescriptor`].
//! Built-in entries are ported from the reference model catalog the
//! orchestration bridge this core replaces shipped inline, spanning three
//! providers so router tests exercise real fallbacks.

use crate::error::OrchestrationError;
use crate::models::{ModelDescriptor, TaskKind};
use dashmap::DashMap;
use std::sync::Arc;

/// Read-only-after-init catalog of model descriptors.
///
/// Mutation is confined to `register`, used during startup or tests; the
/// hot read path (`lookup`, `models_for_kind`, …) never blocks on it beyond
/// a `DashMap` shard lock.
#[derive(Clone)]
pub struct ModelRegistry {
    descriptors: Arc<DashMap<String, ModelDescriptor>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ModelRegistry {
    /// Builds a registry seeded with the built-in catalog.
    pub fn new() -> Self {
        let registry = Self {
            descriptors: Arc::new(DashMap::new()),
        };
        for descriptor in builtin_catalog() {
            registry.register(descriptor);
        }
        registry
    }

    /// Builds an empty registry, seeded only with the given descriptors.
    /// Useful for tests that want a tightly controlled catalog.
    pub fn with_descriptors(descriptors: impl IntoIterator<Item = ModelDescriptor>) -> Self {
        let registry = Self {
            descriptors: Arc::new(DashMap::new()),
        };
        for descriptor in descriptors {
            registry.register(descriptor);
        }
        registry
    }

    pub fn register(&self, descriptor: ModelDescriptor) {
        self.descriptors.insert(descriptor.model_id.clone(), descriptor);
    }

    pub fn lookup(&self, model_id: &str) -> Option<ModelDescriptor> {
        self.descriptors.get(model_id).map(|entry| entry.clone())
    }

    /// All model ids whose capability set contains `kind`, in deterministic
    /// (lexicographic) order.
    pub fn models_for_kind(&self, kind: TaskKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .descriptors
            .iter()
            .filter(|entry| entry.capabilities.contains(&kind))
            .map(|entry| entry.model_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn is_local(&self, model_id: &str) -> bool {
        self.lookup(model_id).map(|d| d.is_local).unwrap_or(false)
    }

    /// Cheapest model (by `avg_token_cost`) that supports `kind`; ties
    /// broken lexicographically by `model_id`.
    pub fn cheapest_for(&self, kind: TaskKind) -> Result<ModelDescriptor, OrchestrationError> {
        self.best_by(kind, |d| d.avg_token_cost(), false)
    }

    /// Fastest model (by `typical_latency_secs`) that supports `kind`.
    pub fn fastest_for(&self, kind: TaskKind) -> Result<ModelDescriptor, OrchestrationError> {
        self.best_by(kind, |d| d.typical_latency_secs, false)
    }

    /// Highest-`reliability` model that supports `kind`.
    pub fn best_quality_for(&self, kind: TaskKind) -> Result<ModelDescriptor, OrchestrationError> {
        self.best_by(kind, |d| d.reliability, true)
    }

    fn best_by(
        &self,
        kind: TaskKind,
        key: impl Fn(&ModelDescriptor) -> f64,
        descending: bool,
    ) -> Result<ModelDescriptor, OrchestrationError> {
        let mut candidates: Vec<ModelDescriptor> = self
            .descriptors
            .iter()
            .filter(|entry| entry.capabilities.contains(&kind))
            .map(|entry| entry.clone())
            .collect();
        if candidates.is_empty() {
            return Err(OrchestrationError::NoCapableModel);
        }
        candidates.sort_by(|a, b| {
            let (ka, kb) = (key(a), key(b));
            let ord = ka.partial_cmp(&kb).unwrap_or(std::cmp::Ordering::Equal);
            let ord = if descending { ord.reverse() } else { ord };
            ord.then_with(|| a.model_id.cmp(&b.model_id))
        });
        Ok(candidates.into_iter().next().expect("checked non-empty above"))
    }

    /// Snapshot of every registered descriptor.
    pub fn all(&self) -> Vec<ModelDescriptor> {
        self.descriptors.iter().map(|entry| entry.clone()).collect()
    }
}

fn builtin_catalog() -> Vec<ModelDescriptor> {
    use TaskKind::*;
    vec![
        ModelDescriptor {
            model_id: "groq-llama3-70b".into(),
            provider: "groq".into(),
            provider_model_name: "llama3-70b-8192".into(),
            capabilities: vec![Reasoning, Research, CodeGeneration, Debugging],
            cost_per_input_token: 0.00000059,
            cost_per_output_token: 0.00000079,
            typical_latency_secs: 0.6,
            context_window: 8192,
            reliability: 0.93,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "groq-mixtral-8x7b".into(),
            provider: "groq".into(),
            provider_model_name: "mixtral-8x7b-32768".into(),
            capabilities: vec![Reasoning, CreativeOutput, CodeGeneration],
            cost_per_input_token: 0.00000024,
            cost_per_output_token: 0.00000024,
            typical_latency_secs: 0.5,
            context_window: 32768,
            reliability: 0.88,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "together-mixtral-8x7b".into(),
            provider: "together".into(),
            provider_model_name: "mistralai/Mixtral-8x7B-Instruct-v0.1".into(),
            capabilities: vec![Reasoning, CreativeOutput],
            cost_per_input_token: 0.0000006,
            cost_per_output_token: 0.0000006,
            typical_latency_secs: 1.2,
            context_window: 32768,
            reliability: 0.85,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "together-llama2-70b".into(),
            provider: "together".into(),
            provider_model_name: "togethercomputer/llama-2-70b-chat".into(),
            capabilities: vec![Reasoning, Research, FactChecking],
            cost_per_input_token: 0.0000009,
            cost_per_output_token: 0.0000009,
            typical_latency_secs: 1.5,
            context_window: 4096,
            reliability: 0.82,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "together-nous-hermes-2-yi-34b".into(),
            provider: "together".into(),
            provider_model_name: "NousResearch/Nous-Hermes-2-Yi-34B".into(),
            capabilities: vec![CreativeOutput, Reasoning],
            cost_per_input_token: 0.0000008,
            cost_per_output_token: 0.0000008,
            typical_latency_secs: 1.3,
            context_window: 4096,
            reliability: 0.8,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "openrouter-gpt-3.5-turbo".into(),
            provider: "openrouter".into(),
            provider_model_name: "openai/gpt-3.5-turbo".into(),
            capabilities: vec![Reasoning, Research, CodeGeneration, FactChecking, Debugging],
            cost_per_input_token: 0.0000005,
            cost_per_output_token: 0.0000015,
            typical_latency_secs: 0.9,
            context_window: 16384,
            reliability: 0.9,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "openrouter-claude-instant-1".into(),
            provider: "openrouter".into(),
            provider_model_name: "anthropic/claude-instant-1".into(),
            capabilities: vec![Reasoning, CreativeOutput, FactChecking],
            cost_per_input_token: 0.0000008,
            cost_per_output_token: 0.0000024,
            typical_latency_secs: 1.0,
            context_window: 100_000,
            reliability: 0.91,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "openrouter-llama-2-70b-chat".into(),
            provider: "openrouter".into(),
            provider_model_name: "meta-llama/llama-2-70b-chat".into(),
            capabilities: vec![Reasoning, Research, Debugging],
            cost_per_input_token: 0.0000007,
            cost_per_output_token: 0.0000009,
            typical_latency_secs: 1.4,
            context_window: 4096,
            reliability: 0.83,
            is_local: false,
        },
        ModelDescriptor {
            model_id: "ollama-llama3".into(),
            provider: "ollama".into(),
            provider_model_name: "llama3".into(),
            capabilities: vec![Reasoning, CodeGeneration, CreativeOutput, Debugging],
            cost_per_input_token: 0.0,
            cost_per_output_token: 0.0,
            typical_latency_secs: 2.5,
            context_window: 8192,
            reliability: 0.75,
            is_local: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_then_lookup_round_trips() {
        let registry = ModelRegistry::with_descriptors(vec![]);
        let descriptor = ModelDescriptor {
            model_id: "test-model".into(),
            provider: "test".into(),
            provider_model_name: "test-1".into(),
            capabilities: vec![TaskKind::Reasoning],
            cost_per_input_token: 0.0001,
            cost_per_output_token: 0.0002,
            typical_latency_secs: 1.0,
            context_window: 4096,
            reliability: 0.9,
            is_local: false,
        };
        registry.register(descriptor.clone());
        let found = registry.lookup("test-model").expect("registered descriptor present");
        assert_eq!(found.model_id, descriptor.model_id);
        assert_eq!(found.provider, descriptor.provider);
    }

    #[test]
    fn lookup_unknown_returns_none() {
        let registry = ModelRegistry::with_descriptors(vec![]);
        assert!(registry.lookup("nope").is_none());
    }

    #[test]
    fn selection_helpers_fail_on_empty_filter() {
        let registry = ModelRegistry::with_descriptors(vec![]);
        assert!(matches!(
            registry.cheapest_for(TaskKind::Reasoning),
            Err(OrchestrationError::NoCapableModel)
        ));
    }

    #[test]
    fn builtin_catalog_has_capabilities_and_valid_ranges() {
        let registry = ModelRegistry::new();
        for descriptor in registry.all() {
            assert!(!descriptor.capabilities.is_empty());
            assert!(descriptor.cost_per_input_token >= 0.0);
            assert!(descriptor.cost_per_output_token >= 0.0);
            assert!((0.0..=1.0).contains(&descriptor.reliability));
        }
    }

    #[test]
    fn models_for_kind_is_lexicographically_sorted() {
        let registry = ModelRegistry::new();
        let ids = registry.models_for_kind(TaskKind::Reasoning);
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
