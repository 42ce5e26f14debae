//! Registered integrations and their per-integration protection.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use parking_lot::Mutex;

use crate::integration::{Integration, IntegrationKind};
use crate::observability::metrics;
use crate::resilience::{Admission, CircuitBreaker, RateLimiter};
use crate::sync::status::{IntegrationStatus, StatusRecord};

/// One integration with its limiter, breaker and status record.
#[derive(Debug)]
pub(crate) struct ManagedIntegration {
    pub(crate) name: String,
    pub(crate) kind: IntegrationKind,
    pub(crate) integration: Arc<dyn Integration>,
    pub(crate) limiter: Box<dyn RateLimiter>,
    pub(crate) breaker: Box<dyn CircuitBreaker>,
    pub(crate) status: Mutex<StatusRecord>,
}

impl ManagedIntegration {
    pub(crate) fn new(
        integration: Arc<dyn Integration>,
        limiter: Box<dyn RateLimiter>,
        breaker: Box<dyn CircuitBreaker>,
    ) -> Self {
        Self {
            name: integration.name().to_string(),
            kind: integration.kind(),
            integration,
            limiter,
            breaker,
            status: Mutex::new(StatusRecord::default()),
        }
    }

    pub(crate) fn snapshot(&self) -> IntegrationStatus {
        let state = self.breaker.state();
        let failures = self.breaker.consecutive_failures();
        self.status
            .lock()
            .snapshot(&self.name, self.kind, state, failures)
    }

    pub(crate) fn record_probe(&self, ok: bool) {
        self.status.lock().record_probe(Utc::now(), ok);
    }
}

/// Records exactly one outcome for an admitted call.
///
/// If the dispatch future is dropped before completing, the call is recorded
/// as a failure on both the breaker and the status record, so a half-open
/// trial slot is never leaked and the failure shows up in status.
pub(crate) struct OutcomeGuard<'a> {
    entry: &'a ManagedIntegration,
    admission: Admission,
    started: Instant,
    recorded: bool,
}

impl<'a> OutcomeGuard<'a> {
    pub(crate) fn new(entry: &'a ManagedIntegration, admission: Admission) -> Self {
        Self {
            entry,
            admission,
            started: Instant::now(),
            recorded: false,
        }
    }

    pub(crate) fn record(mut self, success: bool) {
        self.recorded = true;
        self.entry.breaker.record_admitted(self.admission, success);
    }
}

impl Drop for OutcomeGuard<'_> {
    fn drop(&mut self) {
        if self.recorded {
            return;
        }
        let name = &self.entry.name;
        tracing::debug!(integration = %name, "Dispatch cancelled, recording failure");
        self.entry.breaker.record_admitted(self.admission, false);
        self.entry
            .status
            .lock()
            .record_failure(Utc::now(), format!("dispatch to `{name}` cancelled"));
        metrics::record_dispatch(name, "Cancelled", self.started.elapsed());
    }
}
