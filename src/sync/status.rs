//! Per-integration status tracking.
//!
//! # Responsibilities
//! - Record dispatch outcomes, rejections and probe results
//! - Produce read-only `IntegrationStatus` snapshots
//!
//! # Design Decisions
//! - Dispatch outcomes count as passive probes; the health loop records
//!   active probes into the same record under the same lock
//! - `connected` is derived on every snapshot, never stored

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::integration::IntegrationKind;
use crate::resilience::CircuitState;

/// Point-in-time view of one integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationStatus {
    pub name: String,
    pub kind: IntegrationKind,
    pub connected: bool,
    pub circuit_state: CircuitState,
    pub consecutive_failures: u32,
    pub last_success_at: Option<DateTime<Utc>>,
    pub last_failure_at: Option<DateTime<Utc>>,
    pub last_probe_at: Option<DateTime<Utc>>,
    pub last_probe_ok: Option<bool>,
    pub last_error: Option<String>,
    pub successes_total: u64,
    pub failures_total: u64,
    pub invalid_payloads_total: u64,
    pub rate_limited_total: u64,
    pub circuit_rejected_total: u64,
    /// Delivered / attempted; absent until the first attempt.
    pub success_rate: Option<f64>,
}

/// Why a call never reached the integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejection {
    RateLimited,
    CircuitOpen,
}

impl Rejection {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Rejection::RateLimited => "rate_limit",
            Rejection::CircuitOpen => "circuit_open",
        }
    }
}

/// Mutable status, guarded by the integration's status lock.
#[derive(Debug, Default)]
pub(crate) struct StatusRecord {
    /// Most recent reachability observation, active or passive.
    reachable: Option<bool>,
    last_success_at: Option<DateTime<Utc>>,
    last_failure_at: Option<DateTime<Utc>>,
    last_probe_at: Option<DateTime<Utc>>,
    last_probe_ok: Option<bool>,
    last_error: Option<String>,
    successes: u64,
    failures: u64,
    invalid_payloads: u64,
    rate_limited: u64,
    circuit_rejected: u64,
}

impl StatusRecord {
    pub(crate) fn record_success(&mut self, at: DateTime<Utc>) {
        self.reachable = Some(true);
        self.last_success_at = Some(at);
        self.successes += 1;
    }

    /// A downstream failure (connection error or timeout).
    pub(crate) fn record_failure(&mut self, at: DateTime<Utc>, error: String) {
        self.reachable = Some(false);
        self.last_failure_at = Some(at);
        self.last_error = Some(error);
        self.failures += 1;
    }

    /// The downstream answered but refused the payload.
    pub(crate) fn record_invalid_payload(&mut self, error: String) {
        self.reachable = Some(true);
        self.last_error = Some(error);
        self.invalid_payloads += 1;
    }

    pub(crate) fn record_rejection(&mut self, rejection: Rejection, error: String) {
        match rejection {
            Rejection::RateLimited => self.rate_limited += 1,
            Rejection::CircuitOpen => self.circuit_rejected += 1,
        }
        self.last_error = Some(error);
    }

    pub(crate) fn record_probe(&mut self, at: DateTime<Utc>, ok: bool) {
        self.reachable = Some(ok);
        self.last_probe_at = Some(at);
        self.last_probe_ok = Some(ok);
    }

    pub(crate) fn clear_error(&mut self) {
        self.last_error = None;
    }

    pub(crate) fn snapshot(
        &self,
        name: &str,
        kind: IntegrationKind,
        circuit_state: CircuitState,
        consecutive_failures: u32,
    ) -> IntegrationStatus {
        let attempts = self.successes + self.failures;
        IntegrationStatus {
            name: name.to_string(),
            kind,
            connected: circuit_state != CircuitState::Open && self.reachable == Some(true),
            circuit_state,
            consecutive_failures,
            last_success_at: self.last_success_at,
            last_failure_at: self.last_failure_at,
            last_probe_at: self.last_probe_at,
            last_probe_ok: self.last_probe_ok,
            last_error: self.last_error.clone(),
            successes_total: self.successes,
            failures_total: self.failures,
            invalid_payloads_total: self.invalid_payloads,
            rate_limited_total: self.rate_limited,
            circuit_rejected_total: self.circuit_rejected,
            success_rate: (attempts > 0).then(|| self.successes as f64 / attempts as f64),
        }
    }
}
