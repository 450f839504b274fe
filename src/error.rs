//! Error types for the gateway client and the REST backend.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

/// Failures talking to the stock API.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GatewayError {
    /// The symbol does not exist upstream.
    #[error("{0}")]
    NotFound(String),

    /// Upstream refused the request because of its quota.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// No response was received.
    #[error("Network error: {0}")]
    Network(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid request: {0}")]
    Validation(String),

    /// Any other non-success status, carrying the upstream error text.
    #[error("{error} (status {status})")]
    Status { error: String, status: u16 },

    #[error("Invalid response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// HTTP status associated with the failure, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::NotFound(_) => Some(404),
            GatewayError::RateLimited(_) => Some(429),
            GatewayError::Validation(_) => Some(400),
            GatewayError::Server { status, .. } | GatewayError::Status { status, .. } => {
                Some(*status)
            }
            GatewayError::Network(_) | GatewayError::Decode(_) => None,
        }
    }

    /// Text suitable for showing in a slice or page error.
    pub fn user_message(&self) -> String {
        match self {
            GatewayError::NotFound(message)
            | GatewayError::RateLimited(message)
            | GatewayError::Validation(message) => message.clone(),
            GatewayError::Status { error, .. } => error.clone(),
            other => other.to_string(),
        }
    }
}

/// Errors returned by the REST handlers, rendered as `{"message": ...}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Validation(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}
