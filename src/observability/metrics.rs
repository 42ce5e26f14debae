//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_dispatch_total{integration,result}` (counter): dispatches that reached an integration
//! - `gateway_dispatch_duration_seconds{integration}` (histogram): downstream call latency
//! - `gateway_rejections_total{integration,reason}` (counter): calls refused before any I/O
//! - `gateway_circuit_state{integration}` (gauge): 0=closed, 1=half-open, 2=open
//! - `gateway_integration_connected{integration}` (gauge): 1=connected, 0=not
//!
//! # Design Decisions
//! - Prometheus exporter serves its own HTTP listener on `metrics_address`
//! - Histogram buckets span fast chat webhooks through slow ticketing APIs

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::CircuitState;

const DISPATCH_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime. Failures are logged, not fatal.
pub fn init_metrics(addr: SocketAddr) {
    let builder = match PrometheusBuilder::new().set_buckets(DISPATCH_LATENCY_BUCKETS) {
        Ok(builder) => builder,
        Err(e) => {
            tracing::error!(error = %e, "Invalid histogram buckets");
            return;
        }
    };

    if let Err(e) = builder.with_http_listener(addr).install() {
        tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter");
        return;
    }

    describe_counter!(
        "gateway_dispatch_total",
        "Dispatches that reached an integration, by result"
    );
    describe_histogram!(
        "gateway_dispatch_duration_seconds",
        "Downstream call duration in seconds"
    );
    describe_counter!(
        "gateway_rejections_total",
        "Dispatches refused before contacting an integration"
    );
    describe_gauge!(
        "gateway_circuit_state",
        "Circuit breaker state (0 closed, 1 half-open, 2 open)"
    );
    describe_gauge!(
        "gateway_integration_connected",
        "Whether the integration is currently connected"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
}

pub fn record_dispatch(integration: &str, result: &'static str, elapsed: Duration) {
    counter!(
        "gateway_dispatch_total",
        "integration" => integration.to_string(),
        "result" => result
    )
    .increment(1);
    histogram!(
        "gateway_dispatch_duration_seconds",
        "integration" => integration.to_string()
    )
    .record(elapsed.as_secs_f64());
}

pub fn record_rejection(integration: &str, reason: &'static str) {
    counter!(
        "gateway_rejections_total",
        "integration" => integration.to_string(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_circuit_state(integration: &str, state: CircuitState) {
    gauge!("gateway_circuit_state", "integration" => integration.to_string())
        .set(state.as_gauge());
}

pub fn record_integration_health(integration: &str, connected: bool) {
    gauge!("gateway_integration_connected", "integration" => integration.to_string())
        .set(if connected { 1.0 } else { 0.0 });
}
