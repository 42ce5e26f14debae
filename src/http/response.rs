//! Response rendering.
//!
//! # Responsibilities
//! - Map dispatch errors to HTTP status codes with a JSON body
//! - Shape success and health payloads
//!
//! # Design Decisions
//! - Error bodies are always `{"error": kind, "message": text}`
//! - Degraded health still answers 200 so probes see a live process

use std::collections::HashMap;

use axum::{
    extract::rejection::JsonRejection,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::DispatchError;
use crate::sync::{Delivery, IntegrationStatus};

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, status = %status, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request rejected");
        }

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for DispatchError {
    fn from(rejection: JsonRejection) -> Self {
        DispatchError::InvalidRequest(rejection.body_text())
    }
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub status: &'static str,
    #[serde(flatten)]
    pub delivery: Delivery,
}

impl SendMessageResponse {
    pub fn success(delivery: Delivery) -> Self {
        Self {
            status: "success",
            delivery,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

impl OverallStatus {
    pub fn from_connected(all_connected: bool) -> Self {
        if all_connected {
            OverallStatus::Healthy
        } else {
            OverallStatus::Degraded
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub service: &'static str,
    pub timestamp: DateTime<Utc>,
    pub overall_status: OverallStatus,
    pub integrations: HashMap<String, IntegrationStatus>,
}

impl HealthResponse {
    pub fn new(all_connected: bool, integrations: HashMap<String, IntegrationStatus>) -> Self {
        Self {
            service: env!("CARGO_PKG_NAME"),
            timestamp: Utc::now(),
            overall_status: OverallStatus::from_connected(all_connected),
            integrations,
        }
    }
}
