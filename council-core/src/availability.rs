//! # Provider Availability Oracle
//!
//! Decides, at construction time, which providers are usable given the
//! process environment. Credential variable naming mirrors the provider ↔
//! env-var map the original health checker used (`GROQ_API_KEY`,
//! `TOGETHER_API_KEY`, `OPENROUTER_API_KEY`, `OLLAMA_ENDPOINT`, …): a
//! provider is configured iff its variable is set, or, for the local
//! provider, its endpoint variable is set.

use std::collections::{BTreeMap, BTreeSet};
use std::env;

/// One provider's credential variable name and whether it names an
/// endpoint (local provider) rather than a secret.
#[derive(Debug, Clone)]
struct ProviderCredentialSpec {
    env_var: &'static str,
    is_endpoint: bool,
}

fn default_credential_map() -> BTreeMap<&'static str, ProviderCredentialSpec> {
    [
        ("groq", ProviderCredentialSpec { env_var: "GROQ_API_KEY", is_endpoint: false }),
        ("together", ProviderCredentialSpec { env_var: "TOGETHER_API_KEY", is_endpoint: false }),
        ("openrouter", ProviderCredentialSpec { env_var: "OPENROUTER_API_KEY", is_endpoint: false }),
        ("huggingface", ProviderCredentialSpec { env_var: "HUGGINGFACE_TOKEN", is_endpoint: false }),
        ("gemini", ProviderCredentialSpec { env_var: "GEMINI_API_KEY", is_endpoint: false }),
        ("openai", ProviderCredentialSpec { env_var: "OPENAI_API_KEY", is_endpoint: false }),
        ("qwen", ProviderCredentialSpec { env_var: "QWEN_API_KEY", is_endpoint: false }),
        ("ollama", ProviderCredentialSpec { env_var: "OLLAMA_ENDPOINT", is_endpoint: true }),
    ]
    .into_iter()
    .collect()
}

/// Pure-after-construction view of which providers have credentials/
/// endpoints configured in the environment.
///
/// The *available* subset (configured AND not observed Down by the Health
/// Checker AND breaker not Open) is a derived view maintained by
/// [`crate::health::ProviderHealthChecker`], not by this oracle.
pub struct AvailabilityOracle {
    credentials: BTreeMap<&'static str, ProviderCredentialSpec>,
    configured: BTreeSet<String>,
    materials: BTreeMap<String, String>,
}

impl Default for AvailabilityOracle {
    fn default() -> Self {
        Self::from_env()
    }
}

impl AvailabilityOracle {
    /// Reads the process environment once at construction time.
    pub fn from_env() -> Self {
        Self::from_map(default_credential_map())
    }

    fn from_map(credentials: BTreeMap<&'static str, ProviderCredentialSpec>) -> Self {
        let mut configured = BTreeSet::new();
        let mut materials = BTreeMap::new();
        for (provider, spec) in &credentials {
            if let Ok(value) = env::var(spec.env_var) {
                if !value.is_empty() {
                    configured.insert((*provider).to_string());
                    materials.insert((*provider).to_string(), value);
                }
            }
        }
        Self { credentials, configured, materials }
    }

    /// Builds an oracle from an explicit map, bypassing the environment.
    /// Used by tests and by embedders that source credentials from
    /// somewhere other than process env vars.
    pub fn with_configured(providers: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut configured = BTreeSet::new();
        let mut materials = BTreeMap::new();
        for (provider, secret) in providers {
            configured.insert(provider.clone());
            materials.insert(provider, secret);
        }
        Self { credentials: default_credential_map(), configured, materials }
    }

    pub fn configured(&self) -> &BTreeSet<String> {
        &self.configured
    }

    pub fn credential(&self, provider: &str) -> Option<&str> {
        self.materials.get(provider).map(String::as_str)
    }

    pub fn endpoint(&self, provider: &str) -> Option<&str> {
        self.credentials
            .get(provider)
            .filter(|spec| spec.is_endpoint)
            .and_then(|_| self.materials.get(provider))
            .map(String::as_str)
    }

    pub fn is_configured(&self, provider: &str) -> bool {
        self.configured.contains(provider)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_map_marks_providers_configured() {
        let oracle = AvailabilityOracle::with_configured(vec![
            ("groq".to_string(), "secret".to_string()),
        ]);
        assert!(oracle.is_configured("groq"));
        assert!(!oracle.is_configured("together"));
        assert_eq!(oracle.credential("groq"), Some("secret"));
    }

    #[test]
    fn unconfigured_provider_has_no_credential() {
        let oracle = AvailabilityOracle::with_configured(vec![]);
        assert_eq!(oracle.credential("openai"), None);
        assert_eq!(oracle.endpoint("ollama"), None);
    }
}
