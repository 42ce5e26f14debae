//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     Periodic timer
//!     → Probe every integration concurrently
//!     → Record result in the integration's status
//!
//! Passive health checks (sync::manager):
//!     Dispatch outcome observed
//!     → Delivered marks reachable, connection failure or timeout marks unreachable
//! ```
//!
//! # Design Decisions
//! - Active and passive observations are complementary; the latest wins
//! - Probes never touch the circuit breaker or the rate limiter
//! - Health state is per-integration; one slow probe cannot delay another

pub mod active;

pub use active::HealthMonitor;
