//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatch to an integration:
//!     → rate_limit.rs (token bucket admits or rejects)
//!     → circuit_breaker.rs (closed/half-open admits, open rejects)
//!     → timeouts.rs (enforce caller deadline on the downstream call)
//!     → circuit_breaker.rs (record the outcome)
//! ```
//!
//! # Design Decisions
//! - Limiter and breaker are traits so strategies can be swapped per integration
//! - Rejections are never retried here; the caller decides
//! - Every downstream call has a deadline

pub mod circuit_breaker;
pub mod rate_limit;
pub mod timeouts;

pub use circuit_breaker::{Admission, CircuitBreaker, CircuitState, ConsecutiveFailureBreaker};
pub use rate_limit::{RateLimiter, TokenBucket};
