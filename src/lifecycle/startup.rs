//! Startup orchestration.
//!
//! Turns a validated `GatewayConfig` into a registry of webhook integrations,
//! each with its own limiter and breaker.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::config::GatewayConfig;
use crate::integration::webhook::WebhookBuildError;
use crate::integration::WebhookIntegration;
use crate::sync::{RegistrationError, SyncManager, SyncManagerBuilder};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("integration `{name}`: {source}")]
    Integration {
        name: String,
        #[source]
        source: WebhookBuildError,
    },

    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Build the registry described by `config`. The caller starts it.
pub fn build_manager(config: &GatewayConfig) -> Result<SyncManagerBuilder, StartupError> {
    let dispatch_timeout = Duration::from_secs(config.timeouts.dispatch_secs);
    let probe_timeout = Duration::from_secs(config.health_check.timeout_secs);

    let mut builder = SyncManager::builder()
        .dispatch_timeout(dispatch_timeout)
        .health_check(config.health_check.clone());

    for integration in &config.integrations {
        let webhook = WebhookIntegration::from_config(integration, dispatch_timeout, probe_timeout)
            .map_err(|source| StartupError::Integration {
                name: integration.name.clone(),
                source,
            })?;

        let rate_limit = config.rate_limit_for(integration);
        let circuit_breaker = config.circuit_breaker_for(integration);

        tracing::info!(
            integration = %integration.name,
            kind = %integration.kind,
            endpoint = %integration.endpoint,
            requests_per_second = rate_limit.requests_per_second,
            burst = rate_limit.burst_size,
            failure_threshold = circuit_breaker.failure_threshold,
            "Configuring integration"
        );

        builder = builder.register_with_policy(Arc::new(webhook), &rate_limit, &circuit_breaker)?;
    }

    Ok(builder)
}
