//! # Mode-Derived Runtime Configuration
//!
//! Translates an [`ExecutionMode`] into the concrete parallelism and
//! timeout values spec §4.6/§5 pin per mode. `ORCH_PARALLELISM_OVERRIDE`
//! (spec §6) overrides the mode-derived worker-pool size when set.

use crate::models::ExecutionMode;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub parallelism: usize,
    pub per_call_timeout: Duration,
    pub analysis_timeout: Duration,
    pub synthesis_timeout: Duration,
    pub overall_timeout: Duration,
}

impl OrchestratorConfig {
    pub fn for_mode(mode: ExecutionMode) -> Self {
        let (parallelism, per_call_secs, overall_secs) = match mode {
            ExecutionMode::Fast => (3usize, 15u64, 30u64),
            ExecutionMode::Balanced => (5, 30, 120),
            ExecutionMode::BestQuality => (7, 60, 300),
        };
        let parallelism = parallelism_override().unwrap_or(parallelism);
        Self {
            parallelism,
            per_call_timeout: Duration::from_secs(per_call_secs),
            analysis_timeout: Duration::from_secs(10),
            synthesis_timeout: Duration::from_secs(30),
            overall_timeout: Duration::from_secs(overall_secs),
        }
    }
}

fn parallelism_override() -> Option<usize> {
    env::var("ORCH_PARALLELISM_OVERRIDE")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .filter(|value| *value > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_strictly_ordered_per_call_lt_phase_lt_request() {
        for mode in [ExecutionMode::Fast, ExecutionMode::Balanced, ExecutionMode::BestQuality] {
            let config = OrchestratorConfig::for_mode(mode);
            assert!(config.per_call_timeout < config.overall_timeout);
            assert!(config.analysis_timeout < config.overall_timeout);
            assert!(config.synthesis_timeout < config.overall_timeout);
        }
    }

    #[test]
    fn fast_mode_has_lowest_parallelism() {
        assert_eq!(OrchestratorConfig::for_mode(ExecutionMode::Fast).parallelism, 3);
        assert_eq!(OrchestratorConfig::for_mode(ExecutionMode::Balanced).parallelism, 5);
        assert_eq!(OrchestratorConfig::for_mode(ExecutionMode::BestQuality).parallelism, 7);
    }
}
