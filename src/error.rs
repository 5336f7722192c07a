//! Gateway error taxonomy.
//!
//! Adapters never panic and never forward upstream error bodies verbatim;
//! they collapse to `null`/`GatewayError` and the dispatcher maps that to
//! the status codes in spec §7.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Error kinds from spec §7. Validation is raised by route handlers before
/// any adapter runs; the rest originate inside adapters/primitives.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("validation failed: {message}")]
    Validation {
        message: String,
        details: serde_json::Value,
    },

    #[error("upstream '{upstream}' not configured")]
    NotConfigured { upstream: &'static str },

    #[error("upstream '{upstream}' transient failure: {message}")]
    Upstream { upstream: &'static str, message: String },

    #[error("not found")]
    NotFound,

    #[error("circuit open for '{upstream}'")]
    CircuitOpen { upstream: &'static str },

    #[error("rate limited")]
    RateLimited { retry_after_secs: u64 },

    #[error("SSRF allowlist violation: {0}")]
    Forbidden(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl GatewayError {
    pub fn validation(message: impl Into<String>, details: serde_json::Value) -> Self {
        GatewayError::Validation {
            message: message.into(),
            details,
        }
    }
}

/// Whether the development-mode message should be surfaced verbatim.
/// In production the literal `"Internal server error"` is substituted.
pub struct ErrorRenderMode {
    pub is_production: bool,
}

impl GatewayError {
    pub fn into_response_with_mode(self, mode: &ErrorRenderMode) -> Response {
        match self {
            GatewayError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "validation", "message": message, "details": details })),
            )
                .into_response(),
            GatewayError::NotConfigured { upstream } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "not_configured",
                    "message": format!("{upstream} is not configured"),
                    "configured": false,
                })),
            )
                .into_response(),
            GatewayError::Upstream { upstream, message } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "upstream_unavailable",
                    "message": if mode.is_production { "Service temporarily unavailable".to_string() } else { format!("{upstream}: {message}") },
                })),
            )
                .into_response(),
            GatewayError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "not_found", "message": "Resource not found" })),
            )
                .into_response(),
            GatewayError::CircuitOpen { upstream } => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "error": "circuit_open",
                    "message": format!("{upstream} is temporarily unavailable"),
                })),
            )
                .into_response(),
            GatewayError::RateLimited { retry_after_secs } => (
                StatusCode::SERVICE_UNAVAILABLE,
                [("Retry-After", retry_after_secs.to_string())],
                Json(json!({ "error": "rate_limited", "message": "Upstream rate limit reached" })),
            )
                .into_response(),
            GatewayError::Forbidden(detail) => {
                tracing::error!(detail = %detail, "SSRF allowlist violation");
                (
                    StatusCode::FORBIDDEN,
                    Json(json!({ "error": "forbidden", "message": "Request blocked" })),
                )
                    .into_response()
            }
            GatewayError::Internal(err) => {
                tracing::error!(error = %err, "unhandled internal error");
                let message = if mode.is_production {
                    "Internal server error".to_string()
                } else {
                    err.to_string()
                };
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal", "message": message })),
                )
                    .into_response()
            }
        }
    }
}

/// Default IntoResponse (production rendering) for contexts that can't thread
/// the render mode through (e.g. trait impls called from generic extractors).
impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.into_response_with_mode(&ErrorRenderMode { is_production: true })
    }
}
