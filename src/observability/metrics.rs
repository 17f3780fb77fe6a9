//! Metrics collection and exposition.
//!
//! # Metrics
//! - `pool_breaker_state` (gauge): 0=closed, 1=open, 2=half-open, per endpoint
//! - `pool_endpoint_calls_total` (counter): acquire outcomes by endpoint, outcome
//! - `pool_replica_failovers_total` (counter): read attempts that moved past a replica
//! - `pool_read_exhausted_total` (counter): reads where every replica failed
//!
//! Recording is a no-op until a recorder is installed, so library users that
//! never call `init_metrics` pay only for the macro lookups.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_breaker_state(endpoint: &str, state: CircuitState) {
    ::metrics::gauge!("pool_breaker_state", "endpoint" => endpoint.to_string()).set(state as u8 as f64);
}

pub fn record_endpoint_call(endpoint: &str, outcome: &'static str) {
    ::metrics::counter!(
        "pool_endpoint_calls_total",
        "endpoint" => endpoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

pub fn record_replica_failover(endpoint: &str) {
    ::metrics::counter!("pool_replica_failovers_total", "endpoint" => endpoint.to_string()).increment(1);
}

pub fn record_read_exhausted(pool: &str) {
    ::metrics::counter!("pool_read_exhausted_total", "pool" => pool.to_string()).increment(1);
}
