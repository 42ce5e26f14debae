//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Integration names are unique routing keys
//! - Validate value ranges (rates > 0, thresholds >= 1, timeouts bounded)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{CircuitBreakerConfig, GatewayConfig, RateLimitConfig};

/// Upper bound on the per-dispatch deadline.
pub const MAX_DISPATCH_SECS: u64 = 300;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid bind address `{0}`")]
    BindAddress(String),

    #[error("integration #{index} has an empty name")]
    EmptyName { index: usize },

    #[error("integration `{0}` is defined more than once")]
    DuplicateName(String),

    #[error("integration `{name}` has an invalid {field}: `{value}`")]
    InvalidUrl {
        name: String,
        field: &'static str,
        value: String,
    },

    #[error("{scope}: requests_per_second must be positive, found {value}")]
    RequestsPerSecond { scope: String, value: f64 },

    #[error("{scope}: burst_size must be at least 1")]
    BurstSize { scope: String },

    #[error("{scope}: failure_threshold must be at least 1")]
    FailureThreshold { scope: String },

    #[error("{scope}: open_timeout_secs must be positive")]
    OpenTimeout { scope: String },

    #[error("{scope}: half_open_trial_limit must be at least 1")]
    TrialLimit { scope: String },

    #[error("health_check.interval_secs must be positive")]
    HealthInterval,

    #[error("health_check.timeout_secs must be positive")]
    HealthTimeout,

    #[error("timeouts.dispatch_secs must be between 1 and {max}, found {found}")]
    DispatchTimeout { found: u64, max: u64 },

    #[error("timeouts.request_secs ({request_secs}) must exceed timeouts.dispatch_secs ({dispatch_secs})")]
    RequestTimeout {
        request_secs: u64,
        dispatch_secs: u64,
    },

    #[error("invalid metrics address `{0}`")]
    MetricsAddress(String),

    #[error("admin.api_key must not be empty when admin is enabled")]
    AdminKey,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    check_rate_limit("rate_limit", &config.rate_limit, &mut errors);
    check_circuit_breaker("circuit_breaker", &config.circuit_breaker, &mut errors);

    let mut seen = HashSet::new();
    for (index, integration) in config.integrations.iter().enumerate() {
        let name = integration.name.trim();
        if name.is_empty() {
            errors.push(ValidationError::EmptyName { index });
        } else if !seen.insert(name.to_string()) {
            errors.push(ValidationError::DuplicateName(name.to_string()));
        }

        if reqwest::Url::parse(&integration.endpoint).is_err() {
            errors.push(ValidationError::InvalidUrl {
                name: integration.name.clone(),
                field: "endpoint",
                value: integration.endpoint.clone(),
            });
        }
        if let Some(health_url) = &integration.health_url {
            if reqwest::Url::parse(health_url).is_err() {
                errors.push(ValidationError::InvalidUrl {
                    name: integration.name.clone(),
                    field: "health_url",
                    value: health_url.clone(),
                });
            }
        }

        if let Some(rate_limit) = &integration.rate_limit {
            let scope = format!("integrations.{}.rate_limit", integration.name);
            check_rate_limit(&scope, rate_limit, &mut errors);
        }
        if let Some(breaker) = &integration.circuit_breaker {
            let scope = format!("integrations.{}.circuit_breaker", integration.name);
            check_circuit_breaker(&scope, breaker, &mut errors);
        }
    }

    if config.health_check.enabled {
        if config.health_check.interval_secs == 0 {
            errors.push(ValidationError::HealthInterval);
        }
        if config.health_check.timeout_secs == 0 {
            errors.push(ValidationError::HealthTimeout);
        }
    }

    let dispatch = config.timeouts.dispatch_secs;
    if dispatch == 0 || dispatch > MAX_DISPATCH_SECS {
        errors.push(ValidationError::DispatchTimeout {
            found: dispatch,
            max: MAX_DISPATCH_SECS,
        });
    }
    // The HTTP timeout must not fire before a dispatch can report its own.
    if config.timeouts.request_secs <= dispatch {
        errors.push(ValidationError::RequestTimeout {
            request_secs: config.timeouts.request_secs,
            dispatch_secs: dispatch,
        });
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::AdminKey);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_rate_limit(scope: &str, config: &RateLimitConfig, errors: &mut Vec<ValidationError>) {
    let rps = config.requests_per_second;
    if rps.is_nan() || rps.is_infinite() || rps <= 0.0 {
        errors.push(ValidationError::RequestsPerSecond {
            scope: scope.to_string(),
            value: config.requests_per_second,
        });
    }
    if config.burst_size == 0 {
        errors.push(ValidationError::BurstSize {
            scope: scope.to_string(),
        });
    }
}

fn check_circuit_breaker(
    scope: &str,
    config: &CircuitBreakerConfig,
    errors: &mut Vec<ValidationError>,
) {
    if config.failure_threshold == 0 {
        errors.push(ValidationError::FailureThreshold {
            scope: scope.to_string(),
        });
    }
    if config.open_timeout_secs == 0 {
        errors.push(ValidationError::OpenTimeout {
            scope: scope.to_string(),
        });
    }
    if config.half_open_trial_limit == 0 {
        errors.push(ValidationError::TrialLimit {
            scope: scope.to_string(),
        });
    }
}
