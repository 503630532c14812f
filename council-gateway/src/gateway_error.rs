//! # Gateway Error Types Module
//!
//! This module defines the error types for the council gateway's one HTTP
//! boundary, `POST /requests`, and maps them to HTTP responses.
//!
//! Everything past that boundary is reported through the progress stream as
//! a `ProgressEvent::Error`, not as an HTTP error, so this enum only needs
//! to cover request validation and orchestrator unavailability — the
//! teacher's auth/rate-limit/content-filter/cache/plugin variants have no
//! counterpart on this surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error types for the council gateway's HTTP boundary.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Invalid or malformed request errors
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Internal gateway server errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    /// Service unavailability errors
    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            GatewayError::InvalidRequest { .. } => (StatusCode::BAD_REQUEST, "invalid_request"),
            GatewayError::Internal { .. } => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error")
            }
            GatewayError::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
        };

        let body = Json(json!({
            "error": {
                "message": self.to_string(),
                "type": error_type,
                "code": status.as_u16()
            }
        }));

        (status, body).into_response()
    }
}
