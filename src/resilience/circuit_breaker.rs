//! Circuit breaker for downstream protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: downstream assumed down, calls fail fast
//! - Half-Open: a limited number of trial calls test recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive failures >= failure_threshold
//! Open → Half-Open: first admission check after open_timeout (lazy, no timer)
//! Half-Open → Closed: half_open_trial_limit trial calls succeed
//! Half-Open → Open: any trial call fails
//! any → Closed: administrative reset
//! ```
//!
//! # Design Decisions
//! - Per-integration circuit breaker (not global)
//! - Admission and outcome recording are separate critical sections so the
//!   downstream call never runs under the lock
//! - Every transition starts a new generation; an outcome reported through
//!   `record_admitted` for an older generation is ignored, so a slow call
//!   admitted while Closed cannot reopen or close a later Half-Open window

use std::fmt;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::CircuitBreakerConfig;
use crate::observability::metrics;

/// Failure-isolation strategy consulted before every downstream call.
pub trait CircuitBreaker: Send + Sync + fmt::Debug {
    /// Returns true if a call may be attempted now.
    fn allow_request(&self) -> bool;

    /// Record the outcome of a call that `allow_request` admitted.
    fn record_outcome(&self, success: bool);

    fn state(&self) -> CircuitState;

    fn consecutive_failures(&self) -> u32;

    /// Force the breaker Closed, discarding all counters.
    fn reset(&self);

    /// Admission check that tags the call with the breaker's generation.
    fn admit(&self) -> Option<Admission> {
        self.allow_request().then(Admission::default)
    }

    /// Record the outcome of a call admitted by `admit`.
    fn record_admitted(&self, _admission: Admission, success: bool) {
        self.record_outcome(success);
    }
}

/// Proof that a call was admitted, and in which breaker generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Admission {
    generation: u64,
}

impl Admission {
    pub fn new(generation: u64) -> Self {
        Self { generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Numeric form used for the circuit state gauge.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
    last_state_change: Instant,
    trials_admitted: u32,
    trial_successes: u32,
    generation: u64,
}

impl BreakerState {
    fn transition(&mut self, name: &str, to: CircuitState, now: Instant) {
        let from = self.state;
        self.state = to;
        self.generation = self.generation.wrapping_add(1);
        self.last_state_change = now;
        self.trials_admitted = 0;
        self.trial_successes = 0;

        match to {
            CircuitState::Open => tracing::warn!(
                integration = %name,
                from = %from,
                failures = self.consecutive_failures,
                "Circuit breaker opening"
            ),
            CircuitState::HalfOpen => tracing::info!(
                integration = %name,
                "Circuit breaker half-open, admitting trial calls"
            ),
            CircuitState::Closed => tracing::info!(
                integration = %name,
                from = %from,
                "Circuit breaker closed"
            ),
        }
        metrics::record_circuit_state(name, to);
    }
}

/// Three-state breaker that trips on consecutive failures.
#[derive(Debug)]
pub struct ConsecutiveFailureBreaker {
    name: String,
    failure_threshold: u32,
    open_timeout: Duration,
    half_open_trial_limit: u32,
    inner: Mutex<BreakerState>,
}

impl ConsecutiveFailureBreaker {
    pub fn new(
        name: impl Into<String>,
        failure_threshold: u32,
        open_timeout: Duration,
        half_open_trial_limit: u32,
    ) -> Self {
        Self {
            name: name.into(),
            failure_threshold: failure_threshold.max(1),
            open_timeout,
            half_open_trial_limit: half_open_trial_limit.max(1),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                last_state_change: Instant::now(),
                trials_admitted: 0,
                trial_successes: 0,
                generation: 0,
            }),
        }
    }

    pub fn from_config(name: impl Into<String>, config: &CircuitBreakerConfig) -> Self {
        Self::new(
            name,
            config.failure_threshold,
            Duration::from_secs(config.open_timeout_secs),
            config.half_open_trial_limit,
        )
    }

    /// Admission check against an explicit clock reading.
    pub fn allow_request_at(&self, now: Instant) -> bool {
        self.admit_at(now).is_some()
    }

    pub fn admit_at(&self, now: Instant) -> Option<Admission> {
        let mut inner = self.inner.lock();

        if inner.state == CircuitState::Open {
            let elapsed = now
                .checked_duration_since(inner.last_state_change)
                .unwrap_or_default();
            if elapsed < self.open_timeout {
                return None;
            }
            inner.transition(&self.name, CircuitState::HalfOpen, now);
        }

        let admitted = match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.trials_admitted < self.half_open_trial_limit {
                    inner.trials_admitted += 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => false,
        };
        admitted.then(|| Admission::new(inner.generation))
    }

    /// Record an outcome unless the breaker has moved on since admission.
    pub fn record_admitted_at(&self, admission: Admission, success: bool, now: Instant) {
        let mut inner = self.inner.lock();
        if admission.generation != inner.generation {
            tracing::debug!(
                integration = %self.name,
                success,
                state = %inner.state,
                "Ignoring outcome from an earlier breaker generation"
            );
            return;
        }
        self.apply_outcome(&mut inner, success, now);
    }

    /// Outcome recording against an explicit clock reading.
    pub fn record_outcome_at(&self, success: bool, now: Instant) {
        let mut inner = self.inner.lock();
        self.apply_outcome(&mut inner, success, now);
    }

    fn apply_outcome(&self, inner: &mut BreakerState, success: bool, now: Instant) {
        if !success {
            inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        }

        match (inner.state, success) {
            (CircuitState::Closed, true) => {
                inner.consecutive_failures = 0;
            }
            (CircuitState::Closed, false) => {
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.transition(&self.name, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, true) => {
                // Only count successes for trials that are actually outstanding.
                if inner.trial_successes < inner.trials_admitted {
                    inner.trial_successes += 1;
                }
                if inner.trial_successes >= self.half_open_trial_limit {
                    inner.consecutive_failures = 0;
                    inner.transition(&self.name, CircuitState::Closed, now);
                }
            }
            (CircuitState::HalfOpen, false) => {
                inner.transition(&self.name, CircuitState::Open, now);
            }
            (CircuitState::Open, _) => {
                tracing::debug!(
                    integration = %self.name,
                    success,
                    "Outcome recorded while open, no transition"
                );
            }
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl CircuitBreaker for ConsecutiveFailureBreaker {
    fn allow_request(&self) -> bool {
        self.allow_request_at(Instant::now())
    }

    fn record_outcome(&self, success: bool) {
        self.record_outcome_at(success, Instant::now())
    }

    fn admit(&self) -> Option<Admission> {
        self.admit_at(Instant::now())
    }

    fn record_admitted(&self, admission: Admission, success: bool) {
        self.record_admitted_at(admission, success, Instant::now())
    }

    fn state(&self) -> CircuitState {
        self.inner.lock().state
    }

    fn consecutive_failures(&self) -> u32 {
        self.inner.lock().consecutive_failures
    }

    fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.consecutive_failures = 0;
        inner.transition(&self.name, CircuitState::Closed, Instant::now());
    }
}
