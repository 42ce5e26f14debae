//! Integration synchronization core.
//!
//! # Data Flow
//! ```text
//! dispatch(ctx, name, message)
//!     → registry lookup          (IntegrationNotFound)
//!     → rate limiter             (RateLimitExceeded, no I/O)
//!     → circuit breaker          (CircuitOpen, no I/O)
//!     → Integration::send under the caller's deadline
//!     → breaker outcome + status record + metrics
//! ```
//!
//! # Design Decisions
//! - The registry is a plain map frozen at construction; no lock on lookup
//! - Each integration has its own limiter, breaker and status lock, so a
//!   failing downstream cannot slow the others
//! - The breaker receives exactly one outcome per admitted call, including
//!   calls whose future is dropped mid-flight

pub mod context;
pub mod manager;
pub(crate) mod registry;
pub mod status;

pub use context::{CallContext, Delivery};
pub use manager::{RegistrationError, SyncManager, SyncManagerBuilder, DEFAULT_DISPATCH_TIMEOUT};
pub use status::IntegrationStatus;
