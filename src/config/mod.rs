//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → integrations, limiters and breakers built once at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the integration registry is fixed for
//!   the process lifetime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    AdminConfig, CircuitBreakerConfig, GatewayConfig, HealthCheckConfig, IntegrationConfig,
    ListenerConfig, LogFormat, ObservabilityConfig, RateLimitConfig, SecurityConfig,
    TimeoutConfig,
};
