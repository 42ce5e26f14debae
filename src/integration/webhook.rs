//! Generic HTTP webhook integration.
//!
//! Delivers each message as a JSON POST to a configured endpoint and probes
//! reachability with a GET. Protocol-specific adapters (SMTP, chat, ticket
//! APIs) live outside this crate; this one covers systems that accept a
//! plain webhook.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;

use crate::config::IntegrationConfig;
use crate::integration::{Integration, IntegrationKind, Message, Outcome, SendError};

#[derive(Serialize)]
struct WebhookPayload<'a> {
    integration: &'a str,
    #[serde(flatten)]
    message: &'a Message,
}

#[derive(Debug, Clone)]
pub struct WebhookIntegration {
    name: String,
    kind: IntegrationKind,
    endpoint: reqwest::Url,
    health_url: reqwest::Url,
    client: reqwest::Client,
    probe_timeout: Duration,
}

impl WebhookIntegration {
    /// Build from validated configuration.
    pub fn from_config(
        config: &IntegrationConfig,
        send_timeout: Duration,
        probe_timeout: Duration,
    ) -> Result<Self, WebhookBuildError> {
        let endpoint = reqwest::Url::parse(&config.endpoint)
            .map_err(|e| WebhookBuildError::Url(config.endpoint.clone(), e.to_string()))?;
        let health_url = match &config.health_url {
            Some(url) => {
                reqwest::Url::parse(url)
                    .map_err(|e| WebhookBuildError::Url(url.clone(), e.to_string()))?
            }
            None => endpoint.clone(),
        };

        let client = reqwest::Client::builder()
            .timeout(send_timeout)
            .user_agent(concat!("integration-gateway/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(WebhookBuildError::Client)?;

        Ok(Self {
            name: config.name.clone(),
            kind: config.kind,
            endpoint,
            health_url,
            client,
            probe_timeout,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookBuildError {
    #[error("invalid url `{0}`: {1}")]
    Url(String, String),

    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
}

fn classify_error(err: reqwest::Error) -> SendError {
    if err.is_timeout() {
        SendError::Timeout
    } else {
        SendError::ConnectionFailed(err.to_string())
    }
}

fn extract_reference(body: &serde_json::Value) -> Option<String> {
    ["reference", "id", "key"]
        .iter()
        .find_map(|field| match body.get(*field)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[async_trait]
impl Integration for WebhookIntegration {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> IntegrationKind {
        self.kind
    }

    async fn send(&self, message: &Message) -> Result<Outcome, SendError> {
        let payload = WebhookPayload {
            integration: &self.name,
            message,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&payload)
            .send()
            .await
            .map_err(classify_error)?;

        let status = response.status();
        if status.is_success() {
            let reference = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .as_ref()
                .and_then(extract_reference);
            return Ok(Outcome { reference });
        }

        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            let detail = response.text().await.unwrap_or_default();
            return Err(SendError::InvalidPayload(format!(
                "{}: {}",
                status,
                detail.trim()
            )));
        }

        Err(SendError::ConnectionFailed(format!(
            "{} returned {}",
            self.endpoint, status
        )))
    }

    async fn probe(&self) -> bool {
        let request = self
            .client
            .get(self.health_url.clone())
            .timeout(self.probe_timeout);

        match request.send().await {
            Ok(response) => {
                let ok = response.status().is_success();
                if !ok {
                    tracing::warn!(
                        integration = %self.name,
                        status = %response.status(),
                        "Probe failed: non-success status"
                    );
                }
                ok
            }
            Err(e) => {
                tracing::warn!(integration = %self.name, error = %e, "Probe failed");
                false
            }
        }
    }
}
