//! Downstream integration abstraction.
//!
//! # Data Flow
//! ```text
//! SyncManager::dispatch
//!     → Integration::send (concrete adapter, e.g. webhook.rs)
//!     → Outcome or SendError
//!
//! Health loop
//!     → Integration::probe
//!     → reachable / unreachable
//! ```
//!
//! # Design Decisions
//! - The core depends only on the trait; adapters are collaborators
//! - Adapters are shared behind `Arc` and must tolerate concurrent sends
//! - Cancellation is best-effort: a timed-out send future is dropped

pub mod webhook;

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use webhook::WebhookIntegration;

/// Category of downstream system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum IntegrationKind {
    Email,
    Chat,
    Ticketing,
    #[default]
    Webhook,
}

impl fmt::Display for IntegrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntegrationKind::Email => "email",
            IntegrationKind::Chat => "chat",
            IntegrationKind::Ticketing => "ticketing",
            IntegrationKind::Webhook => "webhook",
        };
        f.write_str(s)
    }
}

/// A message to deliver through an integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Message {
    pub content: String,

    /// Adapter-specific fields (channel, recipient, project key...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Message {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// What the downstream system reported for a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Outcome {
    /// Downstream identifier for the delivered item, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
}

impl Outcome {
    pub fn delivered() -> Self {
        Self::default()
    }

    pub fn with_reference(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
        }
    }
}

/// Failures an integration may report for a single send.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("downstream call timed out")]
    Timeout,

    #[error("payload rejected: {0}")]
    InvalidPayload(String),
}

impl SendError {
    /// Whether this failure counts against the downstream's health.
    ///
    /// A rejected payload means the downstream answered, so it does not.
    pub fn is_downstream_failure(&self) -> bool {
        !matches!(self, SendError::InvalidPayload(_))
    }
}

/// One concrete downstream system.
#[async_trait]
pub trait Integration: Send + Sync {
    /// Unique routing key.
    fn name(&self) -> &str;

    fn kind(&self) -> IntegrationKind {
        IntegrationKind::Webhook
    }

    /// Deliver one message.
    async fn send(&self, message: &Message) -> Result<Outcome, SendError>;

    /// Check reachability without delivering anything.
    async fn probe(&self) -> bool;
}

impl fmt::Debug for dyn Integration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Integration")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .finish()
    }
}
