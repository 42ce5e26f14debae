//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! SyncManager, circuit breakers, health loop
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout, pretty or JSON)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows into the dispatch span
//! - Metric calls are no-ops until a recorder is installed, so tests and
//!   library users pay nothing

pub mod logging;
pub mod metrics;
