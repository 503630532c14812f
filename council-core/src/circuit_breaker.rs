//! # Circuit Breaker
//!
//! Per-provider three-state machine (Closed / Open / HalfOpen) guarding the
//! Executor from hammering an unhealthy provider. One [`CircuitBreaker`]
//! tracks exactly one provider; [`BreakerRegistry`] is the process-wide,
//! read-mostly collection of them that the Orchestrator wires into the
//! Executor and Health Checker.
//!
//! State transitions (see spec):
//!
//! | From | Trigger | To |
//! |---|---|---|
//! | Closed | `failure_threshold` consecutive failures | Open |
//! | Closed | success | Closed (counter reset) |
//! | Open | recovery timeout elapsed | HalfOpen (one probe allowed) |
//! | HalfOpen | probe succeeds | Closed |
//! | HalfOpen | probe fails | Open (timeout doubles, capped) |

use crate::models::{BreakerState, BreakerStateKind, RankedCandidate};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures, from Closed, before the breaker opens.
    pub failure_threshold: u32,
    /// Initial time an Open breaker waits before allowing a probe.
    #[serde(with = "crate::common::duration_serde")]
    pub recovery_timeout: Duration,
    /// Ceiling the doubling recovery timeout is clamped to.
    #[serde(with = "crate::common::duration_serde")]
    pub max_recovery_timeout: Duration,
    /// Probes allowed while HalfOpen before further calls are blocked.
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            recovery_timeout: Duration::from_secs(60),
            max_recovery_timeout: Duration::from_secs(960),
            half_open_max_calls: 1,
        }
    }
}

struct InnerState {
    state: BreakerStateKind,
    failure_count: u32,
    opened_at: Option<Instant>,
    current_timeout: Duration,
    half_open_calls: u32,
}

impl InnerState {
    fn fresh(base_timeout: Duration) -> Self {
        Self {
            state: BreakerStateKind::Closed,
            failure_count: 0,
            opened_at: None,
            current_timeout: base_timeout,
            half_open_calls: 0,
        }
    }
}

/// Tracks one provider's health via consecutive-failure counting and a
/// timed recovery probe.
pub struct CircuitBreaker {
    provider: String,
    config: CircuitBreakerConfig,
    inner: RwLock<InnerState>,
}

impl CircuitBreaker {
    pub fn new(provider: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let base = config.recovery_timeout;
        Self {
            provider: provider.into(),
            config,
            inner: RwLock::new(InnerState::fresh(base)),
        }
    }

    /// `false` iff currently Open and the recovery timeout has not elapsed.
    /// A side effect of calling this while Open past the timeout is the
    /// Open → HalfOpen transition itself (the single probe is granted to
    /// whichever caller observes the elapsed timeout first).
    pub async fn is_available(&self) -> bool {
        let mut inner = self.inner.write().await;
        match inner.state {
            BreakerStateKind::Closed => true,
            BreakerStateKind::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed >= inner.current_timeout {
                    inner.state = BreakerStateKind::HalfOpen;
                    inner.half_open_calls = 0;
                    tracing::info!(provider = %self.provider, "breaker HalfOpen: probe window opened");
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
            BreakerStateKind::HalfOpen => {
                if inner.half_open_calls < self.config.half_open_max_calls {
                    inner.half_open_calls += 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.write().await;
        match inner.state {
            BreakerStateKind::Closed => {
                inner.failure_count = 0;
            }
            BreakerStateKind::HalfOpen => {
                inner.state = BreakerStateKind::Closed;
                inner.failure_count = 0;
                inner.half_open_calls = 0;
                inner.current_timeout = self.config.recovery_timeout;
                tracing::info!(provider = %self.provider, "breaker Closed after successful probe");
            }
            BreakerStateKind::Open => {
                // A racing probe may land here after another caller already
                // flipped us Open again; nothing to do.
            }
        }
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.write().await;
        inner.failure_count += 1;
        match inner.state {
            BreakerStateKind::Closed => {
                if inner.failure_count >= self.config.failure_threshold {
                    inner.state = BreakerStateKind::Open;
                    inner.opened_at = Some(Instant::now());
                    tracing::warn!(
                        provider = %self.provider,
                        failures = inner.failure_count,
                        "breaker Open"
                    );
                }
            }
            BreakerStateKind::HalfOpen => {
                inner.state = BreakerStateKind::Open;
                inner.opened_at = Some(Instant::now());
                inner.half_open_calls = 0;
                inner.current_timeout =
                    (inner.current_timeout * 2).min(self.config.max_recovery_timeout);
                tracing::warn!(provider = %self.provider, "breaker probe failed, back to Open");
            }
            BreakerStateKind::Open => {}
        }
    }

    pub async fn state(&self) -> BreakerStateKind {
        self.inner.read().await.state
    }

    pub async fn stats(&self) -> BreakerState {
        let inner = self.inner.read().await;
        BreakerState {
            provider: self.provider.clone(),
            state: inner.state,
            failure_count: inner.failure_count,
            opened_at: inner.opened_at.map(|instant| {
                let age = instant.elapsed();
                chrono::Utc::now() - chrono::Duration::from_std(age).unwrap_or_default()
            }),
            timeout_secs: inner.current_timeout.as_secs_f64(),
        }
    }

    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        *inner = InnerState::fresh(self.config.recovery_timeout);
    }
}

/// Process-wide, read-mostly collection of per-provider breakers.
///
/// Lazily creates a breaker (with the registry's default config) the first
/// time a provider is referenced, so callers never need to pre-register
/// every provider name up front.
#[derive(Clone)]
pub struct BreakerRegistry {
    breakers: Arc<DashMap<String, Arc<CircuitBreaker>>>,
    default_config: CircuitBreakerConfig,
}

impl Default for BreakerRegistry {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}

impl BreakerRegistry {
    pub fn new(default_config: CircuitBreakerConfig) -> Self {
        Self {
            breakers: Arc::new(DashMap::new()),
            default_config,
        }
    }

    fn get_or_create(&self, provider: &str) -> Arc<CircuitBreaker> {
        if let Some(existing) = self.breakers.get(provider) {
            return existing.clone();
        }
        let breaker = Arc::new(CircuitBreaker::new(provider, self.default_config.clone()));
        self.breakers.insert(provider.to_string(), breaker.clone());
        breaker
    }

    pub async fn is_available(&self, provider: &str) -> bool {
        self.get_or_create(provider).is_available().await
    }

    pub async fn record_success(&self, provider: &str) {
        self.get_or_create(provider).record_success().await;
    }

    pub async fn record_failure(&self, provider: &str) {
        self.get_or_create(provider).record_failure().await;
    }

    pub async fn state(&self, provider: &str) -> BreakerStateKind {
        self.get_or_create(provider).state().await
    }

    pub async fn stats(&self, provider: &str) -> BreakerState {
        self.get_or_create(provider).stats().await
    }

    pub async fn reset(&self, provider: &str) {
        self.get_or_create(provider).reset().await;
    }

    /// First candidate (by ranking order) whose provider is currently
    /// available; `None` if every candidate's provider is Open.
    pub async fn fallback_candidate<'a>(
        &self,
        alternatives: &'a [RankedCandidate],
    ) -> Option<&'a RankedCandidate> {
        for candidate in alternatives {
            if self.is_available(&candidate.provider).await {
                return Some(candidate);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 3,
            recovery_timeout: Duration::from_millis(50),
            max_recovery_timeout: Duration::from_secs(10),
            half_open_max_calls: 1,
        }
    }

    #[tokio::test]
    async fn closed_stays_closed_on_success() {
        let breaker = CircuitBreaker::new("p1", fast_config());
        breaker.record_success().await;
        assert_eq!(breaker.state().await, BreakerStateKind::Closed);
    }

    #[tokio::test]
    async fn opens_after_exactly_f_consecutive_failures() {
        let breaker = CircuitBreaker::new("p1", fast_config());
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerStateKind::Closed);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerStateKind::Closed);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerStateKind::Open);
    }

    #[tokio::test]
    async fn half_open_success_closes_and_failure_reopens_with_doubled_timeout() {
        let breaker = CircuitBreaker::new("p1", fast_config());
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.state().await, BreakerStateKind::Open);
        assert!(!breaker.is_available().await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(breaker.is_available().await);
        assert_eq!(breaker.state().await, BreakerStateKind::HalfOpen);

        breaker.record_success().await;
        assert_eq!(breaker.state().await, BreakerStateKind::Closed);
    }

    #[tokio::test]
    async fn half_open_failure_doubles_timeout_and_reopens() {
        let breaker = CircuitBreaker::new("p1", fast_config());
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(breaker.is_available().await);
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, BreakerStateKind::Open);
        let stats = breaker.stats().await;
        assert!(stats.timeout_secs > 0.05);
    }

    #[tokio::test]
    async fn reset_returns_to_fresh_closed_state() {
        let breaker = CircuitBreaker::new("p1", fast_config());
        for _ in 0..3 {
            breaker.record_failure().await;
        }
        assert_eq!(breaker.state().await, BreakerStateKind::Open);
        breaker.reset().await;
        let stats = breaker.stats().await;
        assert_eq!(stats.state, BreakerStateKind::Closed);
        assert_eq!(stats.failure_count, 0);
    }

    #[tokio::test]
    async fn registry_lazily_creates_per_provider_breakers() {
        let registry = BreakerRegistry::default();
        assert!(registry.is_available("groq").await);
        registry.record_failure("groq").await;
        assert!(registry.is_available("together").await);
        assert_eq!(registry.state("together").await, BreakerStateKind::Closed);
    }

    #[tokio::test]
    async fn fallback_candidate_skips_open_providers() {
        let registry = BreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..fast_config()
        });
        registry.record_failure("down-provider").await;
        let candidates = vec![
            RankedCandidate {
                model_id: "m1".into(),
                provider: "down-provider".into(),
                score: 90.0,
                reason: "top ranked".into(),
                est_cost: 0.001,
                est_time_secs: 1.0,
            },
            RankedCandidate {
                model_id: "m2".into(),
                provider: "up-provider".into(),
                score: 80.0,
                reason: "fallback".into(),
                est_cost: 0.001,
                est_time_secs: 1.0,
            },
        ];
        let picked = registry.fallback_candidate(&candidates).await.expect("one candidate available");
        assert_eq!(picked.model_id, "m2");
    }
}
