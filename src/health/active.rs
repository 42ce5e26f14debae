//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe every registered integration
//! - Record probe results in each integration's status

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tokio::time::{self, MissedTickBehavior};

use crate::config::HealthCheckConfig;
use crate::observability::metrics;
use crate::sync::registry::ManagedIntegration;

pub struct HealthMonitor {
    targets: Vec<Arc<ManagedIntegration>>,
    config: HealthCheckConfig,
}

impl HealthMonitor {
    pub(crate) fn new(targets: Vec<Arc<ManagedIntegration>>, config: HealthCheckConfig) -> Self {
        Self { targets, config }
    }

    /// Probe on every tick until `shutdown` fires or its sender is dropped.
    ///
    /// The first round runs immediately.
    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            integrations = self.targets.len(),
            "Health monitor starting"
        );

        // A zero period would panic in `interval`.
        let period = Duration::from_secs(self.config.interval_secs.max(1));
        let mut ticker = time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tokio::select! {
                        _ = self.check_all() => {}
                        _ = shutdown.recv() => break,
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::info!("Health monitor received shutdown signal, exiting loop");
    }

    async fn check_all(&self) {
        let timeout = Duration::from_secs(self.config.timeout_secs);
        let mut probes = JoinSet::new();

        for target in &self.targets {
            let target = Arc::clone(target);
            probes.spawn(async move {
                let reachable = match time::timeout(timeout, target.integration.probe()).await {
                    Ok(reachable) => {
                        if !reachable {
                            tracing::warn!(integration = %target.name, "Health check failed: unreachable");
                        }
                        reachable
                    }
                    Err(_) => {
                        tracing::warn!(integration = %target.name, "Health check failed: timeout");
                        false
                    }
                };

                target.record_probe(reachable);
                let connected = target.snapshot().connected;
                metrics::record_integration_health(&target.name, connected);
            });
        }

        while let Some(result) = probes.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Health probe task failed");
            }
        }
    }
}
