//! Request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) unless the client sent one
//! - Decode and validate the message submission body
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing and echoed back
//! - Blank fields are rejected here, before any integration is consulted

use std::collections::BTreeMap;

use axum::http::{HeaderMap, HeaderName, Request};
use serde::Deserialize;
use tower_http::request_id::{MakeRequestId, RequestId};

use crate::error::DispatchError;
use crate::integration::Message;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates UUID v4 request IDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = uuid::Uuid::new_v4().to_string();
        id.parse().ok().map(RequestId::new)
    }
}

pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Body of `POST /v1/messages`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    #[serde(default)]
    pub integration_name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

impl SendMessageRequest {
    /// Returns the target integration and the message to deliver.
    pub fn validate(self) -> Result<(String, Message), DispatchError> {
        let name = self.integration_name.trim();
        if name.is_empty() {
            return Err(DispatchError::InvalidRequest(
                "integrationName must not be empty".into(),
            ));
        }
        if self.message.trim().is_empty() {
            return Err(DispatchError::InvalidRequest(
                "message must not be empty".into(),
            ));
        }

        let message = Message {
            content: self.message,
            attributes: self.attributes,
        };
        Ok((name.to_string(), message))
    }
}
