//! # Error Handling
//!
//! Layered error taxonomy for the orchestration core: [`ProviderCallError`]
//! covers a single invocation attempt (what the `ProviderInvoker`
//! collaborator can report), and [`OrchestrationError`] covers the
//! request-level outcomes the Orchestrator and its components surface.
//!
//! Only `RateLimited`/`Transport`/`Server`/`Timeout` count as circuit
//! breaker failures; `Auth`/`BadRequest` are fatal for that attempt but
//! still advance the fallback walk, marking the provider `Degraded` instead.

use thiserror::Error;

/// Categorized failure from one `ProviderInvoker::invoke` attempt.
#[derive(Error, Debug, Clone)]
pub enum ProviderCallError {
    #[error("provider authentication failed: {0}")]
    Auth(String),

    #[error("provider rate limited the request")]
    RateLimited,

    #[error("transport error talking to provider: {0}")]
    Transport(String),

    #[error("provider returned a server error: {0}")]
    Server(String),

    #[error("provider call timed out")]
    Timeout,

    #[error("bad request for provider: {0}")]
    BadRequest(String),

    #[error("unknown provider error: {0}")]
    Unknown(String),
}

impl ProviderCallError {
    /// Whether this attempt should count against the provider's circuit
    /// breaker failure counter (spec §6: only transient/infra failures do).
    pub fn counts_as_breaker_failure(&self) -> bool {
        matches!(
            self,
            ProviderCallError::RateLimited
                | ProviderCallError::Transport(_)
                | ProviderCallError::Server(_)
                | ProviderCallError::Timeout
        )
    }

    /// Whether this attempt should additionally mark the provider
    /// `Degraded` for health-reporting purposes.
    pub fn degrades_provider(&self) -> bool {
        matches!(self, ProviderCallError::Auth(_) | ProviderCallError::BadRequest(_))
    }
}

/// Request-level and component-level error taxonomy surfaced to callers,
/// per spec §7.
#[derive(Error, Debug, Clone)]
pub enum OrchestrationError {
    #[error("no providers are currently available")]
    NoProvidersAvailable,

    #[error("no capable model exists for this subtask")]
    NoCapableModel,

    #[error("circuit breaker is open for provider {provider}")]
    BreakerOpen { provider: String },

    #[error("provider authentication failed: {0}")]
    ProviderAuth(String),

    #[error("provider rate limited the request")]
    ProviderRateLimited,

    #[error("transport error: {0}")]
    ProviderTransport(String),

    #[error("provider server error: {0}")]
    ProviderServer(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("request was cancelled")]
    Cancelled,

    #[error("analysis failed: {0}")]
    AnalysisFailed(String),

    #[error("synthesis failed: {0}")]
    SynthesisFailed(String),

    #[error("overall request deadline exceeded")]
    DeadlineExceeded,

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestrationError {
    /// The stable error code surfaced on the progress bus and in
    /// `FinalResponse.error_message` metadata (spec §6/§7).
    pub fn code(&self) -> &'static str {
        match self {
            OrchestrationError::NoProvidersAvailable => "NoProvidersAvailable",
            OrchestrationError::NoCapableModel => "NoCapableModel",
            OrchestrationError::BreakerOpen { .. } => "BreakerOpen",
            OrchestrationError::ProviderAuth(_) => "ProviderAuth",
            OrchestrationError::ProviderRateLimited => "ProviderRateLimited",
            OrchestrationError::ProviderTransport(_) => "ProviderTransport",
            OrchestrationError::ProviderServer(_) => "ProviderServer",
            OrchestrationError::Timeout(_) => "Timeout",
            OrchestrationError::Cancelled => "Cancelled",
            OrchestrationError::AnalysisFailed(_) => "AnalysisFailed",
            OrchestrationError::SynthesisFailed(_) => "SynthesisFailed",
            OrchestrationError::DeadlineExceeded => "DeadlineExceeded",
            OrchestrationError::Internal(_) => "Internal",
        }
    }
}

impl From<ProviderCallError> for OrchestrationError {
    fn from(err: ProviderCallError) -> Self {
        match err {
            ProviderCallError::Auth(msg) => OrchestrationError::ProviderAuth(msg),
            ProviderCallError::RateLimited => OrchestrationError::ProviderRateLimited,
            ProviderCallError::Transport(msg) => OrchestrationError::ProviderTransport(msg),
            ProviderCallError::Server(msg) => OrchestrationError::ProviderServer(msg),
            ProviderCallError::Timeout => OrchestrationError::Timeout("provider call".into()),
            ProviderCallError::BadRequest(msg) => OrchestrationError::Internal(msg),
            ProviderCallError::Unknown(msg) => OrchestrationError::Internal(msg),
        }
    }
}
