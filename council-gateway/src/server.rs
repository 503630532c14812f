//! # HTTP Server
//!
//! Wires a [`council_core::Orchestrator`] behind the thin HTTP surface
//! described by spec §6: `POST /requests` accepts a prompt and returns
//! `202 {request_id, progress_channel}` immediately, `GET
//! /requests/:id/events` streams the ordered progress events over
//! Server-Sent-Events, and `GET /health` is a liveness probe. Everything
//! past request validation — auth, rate limiting, provider credentials,
//! persistence — is out of scope per spec §1 and is not reintroduced here.

use crate::config::Config;
use crate::demo::{DemoProviderInvoker, InMemoryCostRecorder};
use crate::gateway_error::GatewayError;
use async_stream::stream;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use council_core::analyzer::HeuristicAnalyzer;
use council_core::arbiter::DefaultArbiter;
use council_core::availability::AvailabilityOracle;
use council_core::circuit_breaker::{BreakerRegistry, CircuitBreakerConfig};
use council_core::health::{AlwaysHealthyProbe, ProviderHealthChecker};
use council_core::models::{ExecutionMode, Request as OrchestrationRequest, RequestId};
use council_core::progress::ProgressReceiver;
use council_core::registry::ModelRegistry;
use council_core::synthesizer::DefaultSynthesizer;
use council_core::Orchestrator;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    orchestrator: Arc<Orchestrator>,
    pending: Arc<DashMap<Uuid, ProgressReceiver>>,
}

pub async fn create_server(config: Config) -> anyhow::Result<Router> {
    let registry = ModelRegistry::new();
    let breakers = BreakerRegistry::new(CircuitBreakerConfig::default());
    let oracle = Arc::new(AvailabilityOracle::from_env());
    let health = Arc::new(ProviderHealthChecker::new(
        oracle,
        breakers.clone(),
        Arc::new(AlwaysHealthyProbe),
    ));

    let orchestrator = Arc::new(Orchestrator::new(
        registry,
        breakers,
        health,
        Arc::new(HeuristicAnalyzer),
        Arc::new(DefaultArbiter),
        Arc::new(DefaultSynthesizer),
        Arc::new(DemoProviderInvoker),
        Arc::new(InMemoryCostRecorder::new()),
    ));

    let request_timeout = config.server.request_timeout;
    let state = AppState {
        config: Arc::new(config),
        orchestrator,
        pending: Arc::new(DashMap::new()),
    };

    let router = Router::new()
        .route("/health", get(health_check))
        .route("/requests", post(submit_request))
        .route("/requests/{id}/events", get(stream_events))
        .route("/requests/{id}", delete(cancel_request))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state);

    Ok(router)
}

#[derive(Debug, Deserialize)]
struct SubmitRequestBody {
    content: String,
    #[serde(default)]
    mode: Option<ExecutionMode>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SubmitRequestResponse {
    request_id: Uuid,
    progress_channel: String,
}

async fn submit_request(
    State(state): State<AppState>,
    Json(body): Json<SubmitRequestBody>,
) -> Result<impl IntoResponse, GatewayError> {
    if body.content.trim().is_empty() {
        return Err(GatewayError::InvalidRequest { message: "content must not be empty".into() });
    }

    let mode = body.mode.unwrap_or(state.config.default_mode);
    let request = OrchestrationRequest::new(body.content, mode);
    let request_id = request.id.0;
    let receiver = state.orchestrator.submit(request).await;
    state.pending.insert(request_id, receiver);

    let response = SubmitRequestResponse {
        request_id,
        progress_channel: format!("/requests/{request_id}/events"),
    };
    Ok((axum::http::StatusCode::ACCEPTED, Json(response)))
}

async fn stream_events(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, GatewayError> {
    let (_, mut receiver) = state
        .pending
        .remove(&id)
        .ok_or_else(|| GatewayError::InvalidRequest { message: format!("unknown request id {id}") })?;

    let stream = stream! {
        while let Some(envelope) = receiver.recv().await {
            match Event::default().json_data(&envelope) {
                Ok(event) => yield Ok(event),
                Err(error) => {
                    tracing::error!(%error, "failed to serialize progress envelope");
                }
            }
        }
    };

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15))))
}

/// Requests cancellation of an in-flight request (spec §5). The caller
/// still consumes the terminal `Error{code: Cancelled}` event off the
/// request's own SSE stream; this endpoint just signals the token.
async fn cancel_request(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, GatewayError> {
    if state.orchestrator.cancel(RequestId::from(id)) {
        Ok(axum::http::StatusCode::ACCEPTED)
    } else {
        Err(GatewayError::InvalidRequest { message: format!("unknown request id {id}") })
    }
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;

    async fn test_app() -> TestServer {
        let router = create_server(Config::default()).await.expect("server builds");
        TestServer::new(router).expect("test server starts")
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let server = test_app().await;
        let response = server.get("/health").await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn submitting_empty_content_is_rejected() {
        let server = test_app().await;
        let response = server.post("/requests").json(&serde_json::json!({ "content": "" })).await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn submit_then_stream_reaches_a_final_response() {
        let server = test_app().await;
        let response = server
            .post("/requests")
            .json(&serde_json::json!({ "content": "What is the capital of France?" }))
            .await;
        response.assert_status(axum::http::StatusCode::ACCEPTED);
        let body: SubmitRequestResponse = response.json();

        let events = server.get(&format!("/requests/{}/events", body.request_id)).await;
        events.assert_status_ok();
    }

    #[tokio::test]
    async fn unknown_request_id_events_returns_bad_request() {
        let server = test_app().await;
        let response = server.get(&format!("/requests/{}/events", Uuid::new_v4())).await;
        response.assert_status_bad_request();
    }

    #[tokio::test]
    async fn cancelling_a_submitted_request_is_accepted() {
        let server = test_app().await;
        let submit = server
            .post("/requests")
            .json(&serde_json::json!({ "content": "What is the capital of France?" }))
            .await;
        let body: SubmitRequestResponse = submit.json();

        let response = server.delete(&format!("/requests/{}", body.request_id)).await;
        response.assert_status(axum::http::StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn cancelling_an_unknown_request_id_returns_bad_request() {
        let server = test_app().await;
        let response = server.delete(&format!("/requests/{}", Uuid::new_v4())).await;
        response.assert_status_bad_request();
    }
}
