//! Per-integration admission control.
//!
//! # Responsibilities
//! - Decide whether a call may proceed right now
//! - Refill lazily on every check (no timer task)
//!
//! # Design Decisions
//! - Pure admission check: never blocks or sleeps
//! - One lock per limiter; limiters for different integrations never contend
//! - Rejected callers surface `RateLimitExceeded`, they do not retry here

use std::fmt;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::RateLimitConfig;

/// Admission control strategy consulted before every dispatch.
pub trait RateLimiter: Send + Sync + fmt::Debug {
    /// Returns true if one call may proceed now, consuming capacity.
    fn allow(&self) -> bool;
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

/// Token bucket limiter.
///
/// Starts full. Tokens are fractional between refills and always stay
/// within `[0, burst]`.
#[derive(Debug)]
pub struct TokenBucket {
    rate_per_second: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

impl TokenBucket {
    pub fn new(rate_per_second: f64, burst: f64) -> Self {
        Self::starting_at(rate_per_second, burst, Instant::now())
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_second, config.burst_size as f64)
    }

    fn starting_at(rate_per_second: f64, burst: f64, now: Instant) -> Self {
        let burst = burst.max(0.0);
        Self {
            rate_per_second: rate_per_second.max(0.0),
            burst,
            state: Mutex::new(BucketState {
                tokens: burst,
                last_refill: now,
            }),
        }
    }

    /// Admission check against an explicit clock reading.
    pub fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock();

        // A reading older than the last refill adds nothing.
        let elapsed = now
            .checked_duration_since(state.last_refill)
            .unwrap_or_default()
            .as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.rate_per_second).min(self.burst);
        if now > state.last_refill {
            state.last_refill = now;
        }

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently in the bucket, without refilling.
    pub fn available(&self) -> f64 {
        self.state.lock().tokens
    }

    pub fn burst(&self) -> f64 {
        self.burst
    }
}

impl RateLimiter for TokenBucket {
    fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }
}
