//! # Gateway Configuration
//!
//! TOML-based configuration with environment variable overrides, following
//! the same `load` → `apply_env_overrides` → `validate_schema` pipeline the
//! orchestration core's teacher gateway used. Scoped down to what this thin
//! HTTP surface actually owns: the bind address, request timeout, default
//! execution mode, and log level — auth, provider credentials, and caching
//! are out of scope (spec §1 treats them as external collaborators).

use council_core::models::ExecutionMode;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub default_mode: ExecutionMode,
    pub log_level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(with = "council_core::common::duration_serde")]
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                request_timeout: Duration::from_secs(60),
            },
            default_mode: ExecutionMode::Balanced,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let mut config = match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)?,
            Err(_) => {
                tracing::warn!(path, "no config file found, using defaults");
                Config::default()
            }
        };
        config.apply_env_overrides()?;
        config.validate_schema()?;
        Ok(config)
    }

    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        if let Ok(host) = env::var("GATEWAY_HOST") {
            if !host.is_empty() {
                self.server.host = host;
            }
        }
        if let Ok(port) = env::var("GATEWAY_PORT") {
            self.server.port =
                port.parse().map_err(|_| anyhow::anyhow!("invalid GATEWAY_PORT: {port}"))?;
        }
        if let Ok(timeout) = env::var("GATEWAY_TIMEOUT") {
            self.server.request_timeout =
                council_core::common::duration_serde::parse_duration_string(&timeout)
                    .map_err(|e| anyhow::anyhow!(e))?;
        }
        if let Ok(level) = env::var("GATEWAY_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Ok(mode) = env::var("GATEWAY_DEFAULT_MODE") {
            self.default_mode = match mode.as_str() {
                "fast" => ExecutionMode::Fast,
                "balanced" => ExecutionMode::Balanced,
                "best_quality" => ExecutionMode::BestQuality,
                other => return Err(anyhow::anyhow!("invalid GATEWAY_DEFAULT_MODE: {other}")),
            };
        }
        Ok(())
    }

    pub fn validate_schema(&self) -> anyhow::Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("server host cannot be empty"));
        }
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port must be between 1 and 65535"));
        }
        if self.server.request_timeout.is_zero() {
            return Err(anyhow::anyhow!("request timeout cannot be 0"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        assert!(Config::default().validate_schema().is_ok());
    }

    #[test]
    fn zero_port_fails_validation() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate_schema().is_err());
    }

    #[test]
    fn env_override_changes_host_and_port() {
        std::env::set_var("GATEWAY_HOST", "0.0.0.0");
        std::env::set_var("GATEWAY_PORT", "8080");
        let mut config = Config::default();
        config.apply_env_overrides().unwrap();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        std::env::remove_var("GATEWAY_HOST");
        std::env::remove_var("GATEWAY_PORT");
    }
}
