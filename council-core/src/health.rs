//! # Provider Health Checker
//!
//! Caches per-provider health with a 60 s TTL and a 10 s probe budget,
//! directly grounded on the original health checker: cache lookup first,
//! probe on miss, overlay the circuit breaker's view on top (Open forces
//! `Down`; HalfOpen forces a healthy probe down to `Degraded`), then cache
//! the result. The original's Redis-backed cache is replaced with an
//! in-process map — persistence beyond the cost ledger is out of scope.

use crate::availability::AvailabilityOracle;
use crate::cancel::CancelToken;
use crate::circuit_breaker::BreakerRegistry;
use crate::models::{BreakerStateKind, HealthStatus, ProviderHealth};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const CACHE_TTL: Duration = Duration::from_secs(60);
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Collaborator that actually dials a provider to confirm it is reachable.
/// The core ships no concrete network implementation (provider HTTP
/// clients are an external collaborator per spec §1); `ProviderHealthChecker`
/// is generic over this so a gateway embedder can plug in a real one.
#[async_trait]
pub trait ProviderProbe: Send + Sync {
    /// Returns `Ok(response_ms)` on a healthy probe, `Err(message)` on a
    /// probe that completed but reported trouble. A probe that simply never
    /// returns is handled by the checker's own timeout, not by this trait.
    async fn probe(&self, provider: &str) -> Result<f64, String>;
}

/// Always-healthy probe; useful for tests and for running the crate
/// without any provider credentials configured.
pub struct AlwaysHealthyProbe;

#[async_trait]
impl ProviderProbe for AlwaysHealthyProbe {
    async fn probe(&self, _provider: &str) -> Result<f64, String> {
        Ok(1.0)
    }
}

struct CacheEntry {
    health: ProviderHealth,
    cached_at: Instant,
}

pub struct ProviderHealthChecker {
    oracle: Arc<AvailabilityOracle>,
    breakers: BreakerRegistry,
    probe: Arc<dyn ProviderProbe>,
    cache: DashMap<String, CacheEntry>,
}

impl ProviderHealthChecker {
    pub fn new(
        oracle: Arc<AvailabilityOracle>,
        breakers: BreakerRegistry,
        probe: Arc<dyn ProviderProbe>,
    ) -> Self {
        Self {
            oracle,
            breakers,
            probe,
            cache: DashMap::new(),
        }
    }

    /// Returns cached status if fresh, otherwise probes and caches. `cancel`,
    /// if given, aborts an in-flight probe at its next await point (spec §5:
    /// a cancellation token is propagated to every health probe too).
    pub async fn status(&self, provider: &str, cancel: Option<&CancelToken>) -> ProviderHealth {
        if let Some(entry) = self.cache.get(provider) {
            if entry.cached_at.elapsed() < CACHE_TTL {
                return entry.health.clone();
            }
        }
        let health = self.check_provider(provider, cancel).await;
        self.cache.insert(
            provider.to_string(),
            CacheEntry { health: health.clone(), cached_at: Instant::now() },
        );
        health
    }

    async fn check_provider(&self, provider: &str, cancel: Option<&CancelToken>) -> ProviderHealth {
        if !self.oracle.is_configured(provider) {
            return ProviderHealth {
                provider: provider.to_string(),
                status: HealthStatus::NotConfigured,
                last_check_time: Utc::now(),
                response_ms: None,
                error: Some("no credential configured".to_string()),
            };
        }

        let probe_future = tokio::time::timeout(PROBE_TIMEOUT, self.probe.probe(provider));
        let mut health = match cancel {
            Some(cancel) => {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => ProviderHealth {
                        provider: provider.to_string(),
                        status: HealthStatus::Down,
                        last_check_time: Utc::now(),
                        response_ms: None,
                        error: Some("health probe cancelled".to_string()),
                    },
                    result = probe_future => Self::probe_outcome(provider, result),
                }
            }
            None => Self::probe_outcome(provider, probe_future.await),
        };

        match self.breakers.state(provider).await {
            BreakerStateKind::Open => {
                health.status = HealthStatus::Down;
                health.error.get_or_insert_with(|| "circuit breaker open".to_string());
            }
            BreakerStateKind::HalfOpen => {
                if health.status == HealthStatus::Healthy {
                    health.status = HealthStatus::Degraded;
                    health.error.get_or_insert_with(|| "circuit breaker testing recovery".to_string());
                }
            }
            BreakerStateKind::Closed => {}
        }

        health
    }

    fn probe_outcome(
        provider: &str,
        result: Result<Result<f64, String>, tokio::time::error::Elapsed>,
    ) -> ProviderHealth {
        match result {
            Ok(Ok(response_ms)) => ProviderHealth {
                provider: provider.to_string(),
                status: HealthStatus::Healthy,
                last_check_time: Utc::now(),
                response_ms: Some(response_ms),
                error: None,
            },
            Ok(Err(message)) => ProviderHealth {
                provider: provider.to_string(),
                status: HealthStatus::Degraded,
                last_check_time: Utc::now(),
                response_ms: None,
                error: Some(message),
            },
            Err(_) => ProviderHealth {
                provider: provider.to_string(),
                status: HealthStatus::Down,
                last_check_time: Utc::now(),
                response_ms: None,
                error: Some("health probe timed out".to_string()),
            },
        }
    }

    /// Force-marks `provider` `Degraded` in the cache, bypassing the probe.
    /// Called by the Executor when a provider call fails with an error that
    /// doesn't count as a breaker failure but still signals trouble (spec
    /// §6: `auth`/`bad_request` degrade the provider without tripping the
    /// breaker). Leaves an already-`Down` entry alone — degradation never
    /// upgrades a worse status.
    pub fn mark_degraded(&self, provider: &str, reason: String) {
        let already_down = self
            .cache
            .get(provider)
            .map(|entry| entry.health.status == HealthStatus::Down)
            .unwrap_or(false);
        if already_down {
            return;
        }
        let health = ProviderHealth {
            provider: provider.to_string(),
            status: HealthStatus::Degraded,
            last_check_time: Utc::now(),
            response_ms: None,
            error: Some(reason),
        };
        self.cache.insert(provider.to_string(), CacheEntry { health, cached_at: Instant::now() });
    }

    /// Concurrently refreshes every provider the oracle knows about.
    pub async fn check_all(&self, cancel: Option<&CancelToken>) -> Vec<ProviderHealth> {
        let providers: Vec<String> = self.oracle.configured().iter().cloned().collect();
        let futures = providers.iter().map(|provider| self.status(provider, cancel));
        futures::future::join_all(futures).await
    }

    /// The derived "available" subset per spec §4.2: configured AND not
    /// Down AND breaker not Open.
    pub async fn available_providers(&self, cancel: Option<&CancelToken>) -> Vec<String> {
        let mut available = Vec::new();
        for provider in self.oracle.configured() {
            let health = self.status(provider, cancel).await;
            if health.status != HealthStatus::Down && health.status != HealthStatus::NotConfigured
            {
                available.push(provider.clone());
            }
        }
        available
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit_breaker::CircuitBreakerConfig;

    #[tokio::test]
    async fn unconfigured_provider_is_not_configured() {
        let oracle = Arc::new(AvailabilityOracle::with_configured(vec![]));
        let breakers = BreakerRegistry::new(CircuitBreakerConfig::default());
        let checker = ProviderHealthChecker::new(oracle, breakers, Arc::new(AlwaysHealthyProbe));
        let health = checker.status("groq", None).await;
        assert_eq!(health.status, HealthStatus::NotConfigured);
    }

    #[tokio::test]
    async fn open_breaker_forces_down_regardless_of_probe() {
        let oracle = Arc::new(AvailabilityOracle::with_configured(vec![(
            "groq".to_string(),
            "key".to_string(),
        )]));
        let breakers = BreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        });
        breakers.record_failure("groq").await;
        let checker = ProviderHealthChecker::new(oracle, breakers, Arc::new(AlwaysHealthyProbe));
        let health = checker.status("groq", None).await;
        assert_eq!(health.status, HealthStatus::Down);
    }

    #[tokio::test]
    async fn mark_degraded_overrides_a_healthy_cached_result() {
        let oracle = Arc::new(AvailabilityOracle::with_configured(vec![(
            "groq".to_string(),
            "key".to_string(),
        )]));
        let breakers = BreakerRegistry::new(CircuitBreakerConfig::default());
        let checker = ProviderHealthChecker::new(oracle, breakers, Arc::new(AlwaysHealthyProbe));
        let fresh = checker.status("groq", None).await;
        assert_eq!(fresh.status, HealthStatus::Healthy);

        checker.mark_degraded("groq", "provider auth rejected".to_string());
        let degraded = checker.status("groq", None).await;
        assert_eq!(degraded.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn mark_degraded_never_upgrades_an_already_down_provider() {
        let oracle = Arc::new(AvailabilityOracle::with_configured(vec![(
            "groq".to_string(),
            "key".to_string(),
        )]));
        let breakers = BreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: 1,
            ..CircuitBreakerConfig::default()
        });
        breakers.record_failure("groq").await;
        let checker = ProviderHealthChecker::new(oracle, breakers, Arc::new(AlwaysHealthyProbe));
        let down = checker.status("groq", None).await;
        assert_eq!(down.status, HealthStatus::Down);

        checker.mark_degraded("groq", "also had an auth failure".to_string());
        let still_down = checker.status("groq", None).await;
        assert_eq!(still_down.status, HealthStatus::Down);
    }

    #[tokio::test]
    async fn cached_result_is_reused_within_ttl() {
        let oracle = Arc::new(AvailabilityOracle::with_configured(vec![(
            "groq".to_string(),
            "key".to_string(),
        )]));
        let breakers = BreakerRegistry::new(CircuitBreakerConfig::default());
        let checker = ProviderHealthChecker::new(oracle, breakers, Arc::new(AlwaysHealthyProbe));
        let first = checker.status("groq", None).await;
        let second = checker.status("groq", None).await;
        assert_eq!(first.last_check_time, second.last_check_time);
    }
}
