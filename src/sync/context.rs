//! Per-call context and results.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::integration::Outcome;

/// Caller-supplied deadline and correlation data for one dispatch.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Absolute deadline; the manager's default timeout applies when unset.
    pub deadline: Option<Instant>,
    pub request_id: Option<String>,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            deadline: Some(Instant::now() + timeout),
            request_id: None,
        }
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            request_id: None,
        }
    }

    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = Some(id.into());
        self
    }
}

/// A message delivered through an integration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub integration: String,
    #[serde(flatten)]
    pub outcome: Outcome,
    #[serde(rename = "elapsedMs", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_u64(duration.as_millis() as u64)
}
