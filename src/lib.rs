//! Integration Reliability Layer
//!
//! Routes outbound messages to named downstream integrations (email, chat,
//! ticketing, webhooks), protecting each with its own token-bucket rate
//! limiter and three-state circuit breaker, and tracks per-integration
//! connectivity through a background health loop.

pub mod admin;
pub mod config;
pub mod error;
pub mod health;
pub mod http;
pub mod integration;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod sync;

pub use config::GatewayConfig;
pub use error::DispatchError;
pub use http::HttpServer;
pub use integration::{Integration, IntegrationKind, Message, Outcome, SendError};
pub use sync::{CallContext, Delivery, IntegrationStatus, SyncManager, SyncManagerBuilder};
