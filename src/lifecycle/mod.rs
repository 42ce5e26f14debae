//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → Build integrations → Register with policies
//!     → Start sync manager (health loop)
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain requests
//!     → Stop health loop → Exit
//! ```
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when the registry is ready)

pub mod signals;
pub mod startup;

pub use signals::shutdown_signal;
pub use startup::{build_manager, StartupError};
