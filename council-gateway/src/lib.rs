//! # Council Gateway Library
//!
//! The thin HTTP submission surface for `council-core`'s orchestration
//! pipeline. This crate owns exactly three endpoints:
//!
//! - `POST /requests` — submit a prompt, get `202 {request_id,
//!   progress_channel}` back immediately.
//! - `GET /requests/:id/events` — Server-Sent-Events stream of the ordered
//!   progress envelopes for that request, ending with a terminal
//!   `final_response` or `error` event.
//! - `GET /health` — process liveness.
//!
//! Everything else an HTTP gateway usually owns — auth, rate limiting,
//! provider credentials, caching, a database — is out of scope here; the
//! orchestration core treats those as external collaborators (see
//! `council_core::executor::ProviderInvoker`, `council_core::cost::CostRecorder`).
//! This crate wires in deterministic stand-ins for both (see [`demo`]) so
//! the whole pipeline runs without any external service.
//!
//! ## Quick start
//!
//! ```no_run
//! use council_gateway::{config::Config, server::create_server};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let app = create_server(config).await?;
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod demo;
pub mod gateway_error;
pub mod server;

pub use server::create_server;
