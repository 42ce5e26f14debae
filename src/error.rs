//! Typed dispatch failures.

use std::time::Duration;

use axum::http::StatusCode;
use thiserror::Error;

use crate::integration::SendError;

/// Every way a dispatch can fail, as seen by the request boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("integration `{0}` not found")]
    IntegrationNotFound(String),

    #[error("rate limit exceeded for integration `{0}`")]
    RateLimitExceeded(String),

    #[error("circuit breaker is open for integration `{0}`")]
    CircuitOpen(String),

    #[error("integration `{name}` connection failed: {reason}")]
    ConnectionFailed { name: String, reason: String },

    #[error("integration `{name}` timed out after {waited:?}")]
    Timeout { name: String, waited: Duration },

    #[error("integration `{name}` rejected the payload: {reason}")]
    InvalidPayload { name: String, reason: String },

    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl DispatchError {
    pub(crate) fn from_send(name: &str, err: SendError, waited: Duration) -> Self {
        match err {
            SendError::ConnectionFailed(reason) => DispatchError::ConnectionFailed {
                name: name.to_string(),
                reason,
            },
            SendError::Timeout => DispatchError::Timeout {
                name: name.to_string(),
                waited,
            },
            SendError::InvalidPayload(reason) => DispatchError::InvalidPayload {
                name: name.to_string(),
                reason,
            },
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::IntegrationNotFound(_) => "IntegrationNotFound",
            DispatchError::RateLimitExceeded(_) => "RateLimitExceeded",
            DispatchError::CircuitOpen(_) => "CircuitOpen",
            DispatchError::ConnectionFailed { .. } => "ConnectionFailed",
            DispatchError::Timeout { .. } => "Timeout",
            DispatchError::InvalidPayload { .. } => "InvalidPayload",
            DispatchError::InvalidRequest(_) => "InvalidRequest",
        }
    }

    /// HTTP status the request boundary responds with.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DispatchError::IntegrationNotFound(_) => StatusCode::NOT_FOUND,
            DispatchError::RateLimitExceeded(_) => StatusCode::TOO_MANY_REQUESTS,
            DispatchError::CircuitOpen(_) => StatusCode::SERVICE_UNAVAILABLE,
            DispatchError::ConnectionFailed { .. } => StatusCode::BAD_GATEWAY,
            DispatchError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            DispatchError::InvalidPayload { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            DispatchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}
