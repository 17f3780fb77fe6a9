//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::circuit_breaker::CircuitBreakerConfig;

/// Root configuration for a replicated pool and its probe.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PoolConfig {
    /// Store endpoints.
    pub pool: EndpointsConfig,

    /// Breaker template applied to every endpoint.
    pub circuit_breaker: CircuitBreakerSettings,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Periodic probe settings for the `replica-probe` binary.
    pub probe: ProbeConfig,
}

/// Primary and replica addresses.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Pool name, used as the prefix of every endpoint name.
    pub name: String,

    /// Primary (writable) endpoint, e.g. "redis://10.0.0.1:6379".
    pub primary: String,

    /// Read replica endpoints. Must not be empty.
    pub replicas: Vec<String>,

    /// TCP connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            name: "cache".to_string(),
            primary: "redis://127.0.0.1:6379".to_string(),
            replicas: Vec::new(),
            connect_timeout_ms: 1000,
        }
    }
}

impl EndpointsConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

/// Circuit breaker settings as written in the config file.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerSettings {
    /// Fraction (0, 1] of failed calls in the window that opens the breaker.
    pub failure_rate_threshold: f64,

    /// Number of most recent calls considered while closed.
    pub sliding_window_size: usize,

    /// Calls needed before the failure rate is evaluated (default: full window).
    pub minimum_number_of_calls: Option<usize>,

    /// Time spent open before trial calls are allowed, in milliseconds.
    pub wait_duration_in_open_ms: u64,

    /// Trial calls allowed while half-open.
    pub permitted_calls_in_half_open: usize,
}

impl Default for CircuitBreakerSettings {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 0.5,
            sliding_window_size: 100,
            minimum_number_of_calls: None,
            wait_duration_in_open_ms: 10_000,
            permitted_calls_in_half_open: 10,
        }
    }
}

impl CircuitBreakerSettings {
    pub fn to_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: self.failure_rate_threshold,
            sliding_window_size: self.sliding_window_size,
            minimum_number_of_calls: self.minimum_number_of_calls,
            wait_duration_in_open: Duration::from_millis(self.wait_duration_in_open_ms),
            permitted_calls_in_half_open: self.permitted_calls_in_half_open,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus scrape endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Probe loop configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Run the periodic probe loop.
    pub enabled: bool,

    /// Interval between probe rounds in milliseconds.
    pub interval_ms: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_ms: 5000,
        }
    }
}
