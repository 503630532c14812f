//! # Cost Recorder Collaborator
//!
//! `CostRecorder` is consumed, not implemented, by the core (spec §1): the
//! Orchestrator hands it a per-request cost roll-up after synthesis and
//! moves on regardless of whether persistence succeeds (spec §4.9/§7 —
//! recording failures are logged, never surfaced). This module defines the
//! trait plus the per-provider roll-up shape it's called with, grounded on
//! the aggregation fields the original cost tracker kept (per-provider
//! totals, token counts, subtask counts).

use crate::models::RequestId;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderCostEntry {
    pub model: String,
    pub provider: String,
    pub subtask_count: u32,
    pub total_cost: f64,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

#[async_trait]
pub trait CostRecorder: Send + Sync {
    async fn record(&self, request_id: RequestId, entries: Vec<ProviderCostEntry>);
}

/// No-op recorder for embedders that don't need cost persistence.
pub struct NullCostRecorder;

#[async_trait]
impl CostRecorder for NullCostRecorder {
    async fn record(&self, _request_id: RequestId, _entries: Vec<ProviderCostEntry>) {}
}
