//! Integration registry, routing and status aggregation.
//!
//! # Responsibilities
//! - Own the registry of named integrations (fixed after startup)
//! - Route each dispatch through the integration's limiter and breaker
//! - Aggregate per-integration status into snapshots
//! - Own the background health loop (start on construction, stop on shutdown)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::config::{CircuitBreakerConfig, HealthCheckConfig, RateLimitConfig};
use crate::error::DispatchError;
use crate::health::HealthMonitor;
use crate::integration::{Integration, Message, SendError};
use crate::observability::metrics;
use crate::resilience::timeouts;
use crate::resilience::{
    CircuitBreaker, ConsecutiveFailureBreaker, RateLimiter, TokenBucket,
};
use crate::sync::context::{CallContext, Delivery};
use crate::sync::registry::{ManagedIntegration, OutcomeGuard};
use crate::sync::status::{IntegrationStatus, Rejection};

pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("integration name must not be empty")]
    EmptyName,

    #[error("integration `{0}` already registered")]
    Duplicate(String),
}

/// Collects integrations before the registry is frozen.
#[derive(Debug)]
pub struct SyncManagerBuilder {
    integrations: HashMap<String, Arc<ManagedIntegration>>,
    dispatch_timeout: Duration,
    health_check: HealthCheckConfig,
}

impl Default for SyncManagerBuilder {
    fn default() -> Self {
        Self {
            integrations: HashMap::new(),
            dispatch_timeout: DEFAULT_DISPATCH_TIMEOUT,
            health_check: HealthCheckConfig::default(),
        }
    }
}

impl SyncManagerBuilder {
    /// Deadline applied when the caller does not supply one.
    pub fn dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    pub fn health_check(mut self, config: HealthCheckConfig) -> Self {
        self.health_check = config;
        self
    }

    /// Register an integration with explicitly injected strategies.
    pub fn register(
        mut self,
        integration: Arc<dyn Integration>,
        limiter: Box<dyn RateLimiter>,
        breaker: Box<dyn CircuitBreaker>,
    ) -> Result<Self, RegistrationError> {
        let name = integration.name().to_string();
        if name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        if self.integrations.contains_key(&name) {
            return Err(RegistrationError::Duplicate(name));
        }

        tracing::debug!(integration = %name, kind = %integration.kind(), "Integration registered");
        self.integrations.insert(
            name,
            Arc::new(ManagedIntegration::new(integration, limiter, breaker)),
        );
        Ok(self)
    }

    /// Register an integration with a token bucket and consecutive-failure breaker.
    pub fn register_with_policy(
        self,
        integration: Arc<dyn Integration>,
        rate_limit: &RateLimitConfig,
        circuit_breaker: &CircuitBreakerConfig,
    ) -> Result<Self, RegistrationError> {
        let limiter = Box::new(TokenBucket::from_config(rate_limit));
        let breaker = Box::new(ConsecutiveFailureBreaker::from_config(
            integration.name(),
            circuit_breaker,
        ));
        self.register(integration, limiter, breaker)
    }

    /// Freeze the registry without starting the health loop.
    pub fn build(self) -> SyncManager {
        SyncManager {
            integrations: self.integrations,
            dispatch_timeout: self.dispatch_timeout,
            health_check: self.health_check,
            monitor: Mutex::new(None),
        }
    }

    /// Freeze the registry and start the health loop if enabled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> Arc<SyncManager> {
        self.build().start()
    }
}

struct MonitorHandle {
    stop: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

/// Routes messages to integrations through admission control and failure
/// isolation.
pub struct SyncManager {
    /// Read-only after construction; looked up without locking.
    integrations: HashMap<String, Arc<ManagedIntegration>>,
    dispatch_timeout: Duration,
    health_check: HealthCheckConfig,
    monitor: Mutex<Option<MonitorHandle>>,
}

impl SyncManager {
    pub fn builder() -> SyncManagerBuilder {
        SyncManagerBuilder::default()
    }

    /// Start the health loop (if enabled) and share the manager.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(self) -> Arc<Self> {
        self.spawn_health_loop();
        Arc::new(self)
    }

    fn spawn_health_loop(&self) {
        if !self.health_check.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        let targets = self.integrations.values().cloned().collect();
        let monitor = HealthMonitor::new(targets, self.health_check.clone());
        let (stop, stop_rx) = broadcast::channel(1);
        let task = tokio::spawn(monitor.run(stop_rx));

        *self.monitor.lock() = Some(MonitorHandle { stop, task });
    }

    /// Stop the health loop and wait for it to exit.
    pub async fn shutdown(&self) {
        let handle = self.monitor.lock().take();
        if let Some(MonitorHandle { stop, task }) = handle {
            let _ = stop.send(());
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Health monitor task failed");
            }
            tracing::info!("Sync manager stopped");
        }
    }

    /// True while the background health loop is running.
    pub fn is_monitoring(&self) -> bool {
        self.monitor
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.task.is_finished())
    }

    /// Route one message to the named integration.
    pub async fn dispatch(
        &self,
        ctx: &CallContext,
        name: &str,
        message: &Message,
    ) -> Result<Delivery, DispatchError> {
        let span = tracing::info_span!(
            "dispatch",
            integration = %name,
            request_id = ctx.request_id.as_deref().unwrap_or("-"),
        );
        self.dispatch_inner(ctx, name, message).instrument(span).await
    }

    async fn dispatch_inner(
        &self,
        ctx: &CallContext,
        name: &str,
        message: &Message,
    ) -> Result<Delivery, DispatchError> {
        let Some(entry) = self.integrations.get(name) else {
            tracing::warn!("Unknown integration");
            metrics::record_rejection(name, "not_found");
            return Err(DispatchError::IntegrationNotFound(name.to_string()));
        };

        if !entry.limiter.allow() {
            return Err(self.reject(entry, Rejection::RateLimited));
        }
        let Some(admission) = entry.breaker.admit() else {
            return Err(self.reject(entry, Rejection::CircuitOpen));
        };

        let guard = OutcomeGuard::new(entry, admission);
        let deadline = ctx
            .deadline
            .unwrap_or_else(|| tokio::time::Instant::now() + self.dispatch_timeout);
        let started = Instant::now();

        let result = match timeouts::run_until(deadline, entry.integration.send(message)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::Timeout),
        };
        let elapsed = started.elapsed();

        match result {
            Ok(outcome) => {
                guard.record(true);
                entry.status.lock().record_success(Utc::now());
                metrics::record_dispatch(name, "success", elapsed);
                tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "Message delivered");

                Ok(Delivery {
                    integration: name.to_string(),
                    outcome,
                    elapsed,
                })
            }
            Err(err) => {
                let downstream_failure = err.is_downstream_failure();
                guard.record(!downstream_failure);

                let error = DispatchError::from_send(name, err, elapsed);
                {
                    let mut status = entry.status.lock();
                    if downstream_failure {
                        status.record_failure(Utc::now(), error.to_string());
                    } else {
                        status.record_invalid_payload(error.to_string());
                    }
                }
                metrics::record_dispatch(name, error.kind(), elapsed);
                tracing::warn!(error = %error, "Dispatch failed");
                Err(error)
            }
        }
    }

    fn reject(&self, entry: &ManagedIntegration, rejection: Rejection) -> DispatchError {
        let error = match rejection {
            Rejection::RateLimited => DispatchError::RateLimitExceeded(entry.name.clone()),
            Rejection::CircuitOpen => DispatchError::CircuitOpen(entry.name.clone()),
        };
        entry
            .status
            .lock()
            .record_rejection(rejection, error.to_string());
        metrics::record_rejection(&entry.name, rejection.label());
        tracing::debug!(reason = rejection.label(), "Dispatch rejected");
        error
    }

    /// Consistent copy of every integration's status.
    pub fn status_snapshot(&self) -> HashMap<String, IntegrationStatus> {
        self.integrations
            .iter()
            .map(|(name, entry)| (name.clone(), entry.snapshot()))
            .collect()
    }

    pub fn status(&self, name: &str) -> Option<IntegrationStatus> {
        self.integrations.get(name).map(|entry| entry.snapshot())
    }

    /// True iff every registered integration is connected.
    pub fn all_connected(&self) -> bool {
        self.integrations
            .values()
            .all(|entry| entry.snapshot().connected)
    }

    /// Force an integration's breaker Closed.
    pub fn reset_circuit(&self, name: &str) -> Result<IntegrationStatus, DispatchError> {
        let entry = self
            .integrations
            .get(name)
            .ok_or_else(|| DispatchError::IntegrationNotFound(name.to_string()))?;

        entry.breaker.reset();
        entry.status.lock().clear_error();
        tracing::info!(integration = %name, "Circuit breaker reset by administrator");
        Ok(entry.snapshot())
    }

    pub fn integration_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.integrations.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.integrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }
}

impl Drop for SyncManager {
    fn drop(&mut self) {
        if let Some(handle) = self.monitor.get_mut().take() {
            let _ = handle.stop.send(());
        }
    }
}
