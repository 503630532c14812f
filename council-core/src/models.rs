//! # Data Model
//!
//! Core entities shared by every component of the orchestration pipeline:
//! requests, subtasks, agent responses, rankings, breaker state, and the
//! final synthesized response. Kept free of any component-specific logic —
//! see [`crate::analyzer`], [`crate::router`], [`crate::executor`] and
//! friends for the operations that produce and consume these types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Execution mode selected by the caller; drives parallelism, timeouts,
/// default accuracy requirements, and router scoring adjustments throughout
/// the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    Fast,
    Balanced,
    BestQuality,
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionMode::Fast => write!(f, "fast"),
            ExecutionMode::Balanced => write!(f, "balanced"),
            ExecutionMode::BestQuality => write!(f, "best_quality"),
        }
    }
}

impl ExecutionMode {
    /// Default `accuracy_requirement` for subtasks produced in this mode.
    pub fn default_accuracy_requirement(self) -> f64 {
        match self {
            ExecutionMode::Fast => 0.7,
            ExecutionMode::Balanced => 0.8,
            ExecutionMode::BestQuality => 0.95,
        }
    }
}

/// Identifies one [`Request`] across the pipeline. A thin newtype over
/// [`Uuid`] rather than a bare `Uuid` so a request id can never be passed
/// where a [`SubtaskId`] is expected, or vice versa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl From<Uuid> for RequestId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies one [`Subtask`] across the pipeline. See [`RequestId`] for why
/// this isn't a bare `Uuid`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubtaskId(pub Uuid);

impl SubtaskId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn nil() -> Self {
        Self(Uuid::nil())
    }
}

impl From<Uuid> for SubtaskId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubtaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A caller-submitted request. Immutable after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub content: String,
    pub mode: ExecutionMode,
    pub arrival_time: DateTime<Utc>,
}

impl Request {
    pub fn new(content: impl Into<String>, mode: ExecutionMode) -> Self {
        Self {
            id: RequestId::new(),
            content: content.into(),
            mode,
            arrival_time: Utc::now(),
        }
    }
}

/// Coarse purpose of a request, produced by the Analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Question,
    Generation,
    Reasoning,
    FactCheck,
}

/// Complexity tier, produced by the Analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

/// Semantic category attached to each subtask; determines which model
/// descriptors are eligible to serve it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Reasoning,
    Research,
    CodeGeneration,
    CreativeOutput,
    FactChecking,
    Debugging,
}

/// One atomic unit of work produced by the Analyzer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtask {
    pub id: SubtaskId,
    pub parent_id: RequestId,
    pub content: String,
    pub kind: TaskKind,
    pub priority: u8,
    pub risk: f64,
    pub accuracy_requirement: f64,
}

/// Catalog entry for one provider-native model.
///
/// Invariant: `capabilities` is non-empty, cost fields are `>= 0`, and
/// `reliability` lies in `[0, 1]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescriptor {
    pub model_id: String,
    pub provider: String,
    pub provider_model_name: String,
    pub capabilities: Vec<TaskKind>,
    pub cost_per_input_token: f64,
    pub cost_per_output_token: f64,
    pub typical_latency_secs: f64,
    pub context_window: u32,
    pub reliability: f64,
    pub is_local: bool,
}

impl ModelDescriptor {
    /// Average of input/output per-token cost; the Router uses this as the
    /// cost component's raw input before normalization.
    pub fn avg_token_cost(&self) -> f64 {
        (self.cost_per_input_token + self.cost_per_output_token) / 2.0
    }
}

/// One scored candidate within a [`CandidateRanking`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub model_id: String,
    pub provider: String,
    pub score: f64,
    pub reason: String,
    pub est_cost: f64,
    pub est_time_secs: f64,
}

/// Ordered, deduplicated ranking of candidate models for one subtask.
///
/// Invariant: the first element is the primary; the rest are distinct
/// fallbacks, at most 5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRanking {
    pub subtask_id: SubtaskId,
    pub candidates: Vec<RankedCandidate>,
}

impl Default for CandidateRanking {
    fn default() -> Self {
        Self { subtask_id: SubtaskId::nil(), candidates: Vec::new() }
    }
}

impl CandidateRanking {
    pub fn primary(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }

    pub fn fallbacks(&self) -> &[RankedCandidate] {
        if self.candidates.len() > 1 {
            &self.candidates[1..]
        } else {
            &[]
        }
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Provider-reported or heuristically derived self-assessment attached to
/// every successful [`AgentResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelfAssessment {
    pub confidence: f64,
    pub risk: f64,
    pub est_cost: f64,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub exec_time_secs: f64,
}

/// Outcome of invoking one model for one subtask.
///
/// Invariant: `success` implies non-empty `content` and absent `error`;
/// `!success` implies `error` is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    pub subtask_id: SubtaskId,
    pub model_id: String,
    pub provider: String,
    pub content: String,
    pub success: bool,
    pub self_assessment: SelfAssessment,
    pub error: Option<String>,
}

/// Per-provider circuit breaker snapshot, owned exclusively by
/// [`crate::circuit_breaker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerStateKind {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreakerState {
    pub provider: String,
    pub state: BreakerStateKind,
    pub failure_count: u32,
    pub opened_at: Option<DateTime<Utc>>,
    pub timeout_secs: f64,
}

/// Per-model / per-provider cost and token roll-up for one request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CostEntry {
    pub model_id: String,
    pub provider: String,
    pub cost: f64,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

/// Aggregate cost view attached to a [`FinalResponse`].
///
/// Invariant: the sum of `per_model_cost` equals `total_cost` within `1e-6`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CostBreakdown {
    pub total_cost: f64,
    pub per_model_cost: Vec<CostEntry>,
    pub per_provider_cost: Vec<CostEntry>,
    pub execution_time_secs: f64,
}

/// One entry in the per-request provider-selection audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionLogEntry {
    pub subtask_id: SubtaskId,
    pub chosen_model: String,
    pub provider: String,
    pub reason: String,
    pub alternatives: Vec<String>,
    pub ts: DateTime<Utc>,
}

/// The terminal, synthesized answer to a [`Request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalResponse {
    pub content: String,
    pub overall_confidence: f64,
    pub models_used: Vec<String>,
    pub cost_breakdown: CostBreakdown,
    pub provider_selection_log: Vec<SelectionLogEntry>,
    pub metadata: serde_json::Value,
    pub success: bool,
    pub error_message: Option<String>,
}

/// Provider health, as reported by [`crate::health::ProviderHealthChecker`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
    NotConfigured,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderHealth {
    pub provider: String,
    pub status: HealthStatus,
    pub last_check_time: DateTime<Utc>,
    pub response_ms: Option<f64>,
    pub error: Option<String>,
}

/// Per-provider token/cost roll-up for one request, surfaced to the caller
/// as `final_response.provider_usage_summary` (spec §6). Distinct from
/// [`ProviderHealth`]: this is usage accounting, not a liveness check.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProviderUsageSummary {
    pub provider: String,
    pub total_cost: f64,
    pub tokens_in: u32,
    pub tokens_out: u32,
}

impl From<&CostEntry> for ProviderUsageSummary {
    fn from(entry: &CostEntry) -> Self {
        Self {
            provider: entry.provider.clone(),
            total_cost: entry.cost,
            tokens_in: entry.tokens_in,
            tokens_out: entry.tokens_out,
        }
    }
}
