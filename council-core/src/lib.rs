//! # Council Core
//!
//! Orchestration core for submitting one request to a council of pluggable
//! LLM providers: an [`analyzer`] decomposes it into subtasks, a [`router`]
//! ranks candidate models per subtask under a cost/latency/reliability
//! scoring table, an [`executor`] runs the ranked candidates under bounded
//! parallelism with a [`circuit_breaker`] guarding each provider, an
//! [`arbiter`] resolves any duplicate responses, and a [`synthesizer`]
//! merges the winners into one [`models::FinalResponse`]. The whole walk is
//! driven by [`orchestrator::Orchestrator`] and observed through a
//! [`progress::ProgressBus`].
//!
//! The core deliberately owns none of the things an embedder already has an
//! opinion about — no HTTP surface, no provider HTTP clients, no database.
//! Those are pluggable collaborator traits: [`executor::ProviderInvoker`],
//! [`progress::ProgressSink`], [`cost::CostRecorder`], [`analyzer::Analyzer`],
//! [`health::ProviderProbe`]. A gateway binary (see the sibling
//! `council-gateway` crate) supplies concrete implementations of each.
//!
//! ## Quick start
//!
//! ```no_run
//! use council_core::analyzer::HeuristicAnalyzer;
//! use council_core::arbiter::DefaultArbiter;
//! use council_core::availability::AvailabilityOracle;
//! use council_core::circuit_breaker::{BreakerRegistry, CircuitBreakerConfig};
//! use council_core::cost::NullCostRecorder;
//! use council_core::health::{AlwaysHealthyProbe, ProviderHealthChecker};
//! use council_core::models::{ExecutionMode, Request};
//! use council_core::orchestrator::Orchestrator;
//! use council_core::registry::ModelRegistry;
//! use council_core::synthesizer::DefaultSynthesizer;
//! use std::sync::Arc;
//!
//! # async fn run(invoker: Arc<dyn council_core::executor::ProviderInvoker>) {
//! let registry = ModelRegistry::new();
//! let breakers = BreakerRegistry::new(CircuitBreakerConfig::default());
//! let oracle = Arc::new(AvailabilityOracle::from_env());
//! let health = Arc::new(ProviderHealthChecker::new(
//!     oracle,
//!     breakers.clone(),
//!     Arc::new(AlwaysHealthyProbe),
//! ));
//!
//! let orchestrator = Arc::new(Orchestrator::new(
//!     registry,
//!     breakers,
//!     health,
//!     Arc::new(HeuristicAnalyzer),
//!     Arc::new(DefaultArbiter),
//!     Arc::new(DefaultSynthesizer),
//!     invoker,
//!     Arc::new(NullCostRecorder),
//! ));
//!
//! let request = Request::new("Summarize the French Revolution.", ExecutionMode::Balanced);
//! let mut progress = orchestrator.submit(request).await;
//! while let Some(envelope) = progress.recv().await {
//!     println!("{envelope:?}");
//! }
//! # }
//! ```

pub mod analyzer;
pub mod arbiter;
pub mod availability;
pub mod cancel;
pub mod circuit_breaker;
pub mod common;
pub mod config;
pub mod cost;
pub mod error;
pub mod executor;
pub mod health;
pub mod models;
pub mod orchestrator;
pub mod progress;
pub mod registry;
pub mod router;
pub mod synthesizer;

pub use cancel::CancelToken;
pub use error::{OrchestrationError, ProviderCallError};
pub use models::{ExecutionMode, FinalResponse, Request};
pub use orchestrator::Orchestrator;

/// Result type for orchestration operations.
pub type Result<T> = std::result::Result<T, OrchestrationError>;
