//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check every endpoint address parses
//! - Validate value ranges (threshold, window, durations)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PoolConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::PoolConfig;
use crate::net::connector::parse_endpoint;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a deserialized configuration.
pub fn validate_config(config: &PoolConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let pool = &config.pool;
    if pool.name.trim().is_empty() {
        errors.push(ValidationError::new("pool.name", "must not be empty"));
    }
    if pool.primary.trim().is_empty() {
        errors.push(ValidationError::new("pool.primary", "must not be empty"));
    } else if let Err(e) = parse_endpoint(&pool.primary) {
        errors.push(ValidationError::new("pool.primary", e.to_string()));
    }
    if pool.replicas.is_empty() {
        errors.push(ValidationError::new("pool.replicas", "there must be at least one replica"));
    }
    for (i, replica) in pool.replicas.iter().enumerate() {
        if let Err(e) = parse_endpoint(replica) {
            errors.push(ValidationError::new(format!("pool.replicas[{}]", i), e.to_string()));
        }
    }
    if pool.connect_timeout_ms == 0 {
        errors.push(ValidationError::new("pool.connect_timeout_ms", "must be > 0"));
    }

    let cb = &config.circuit_breaker;
    if !(cb.failure_rate_threshold > 0.0 && cb.failure_rate_threshold <= 1.0) {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_rate_threshold",
            format!("must be in (0, 1], got {}", cb.failure_rate_threshold),
        ));
    }
    if cb.sliding_window_size == 0 {
        errors.push(ValidationError::new("circuit_breaker.sliding_window_size", "must be > 0"));
    }
    if let Some(min) = cb.minimum_number_of_calls {
        if min == 0 || min > cb.sliding_window_size {
            errors.push(ValidationError::new(
                "circuit_breaker.minimum_number_of_calls",
                format!("must be between 1 and sliding_window_size ({})", cb.sliding_window_size),
            ));
        }
    }
    if cb.wait_duration_in_open_ms == 0 {
        errors.push(ValidationError::new("circuit_breaker.wait_duration_in_open_ms", "must be > 0"));
    }
    if cb.permitted_calls_in_half_open == 0 {
        errors.push(ValidationError::new("circuit_breaker.permitted_calls_in_half_open", "must be > 0"));
    }

    if config.probe.enabled && config.probe.interval_ms == 0 {
        errors.push(ValidationError::new("probe.interval_ms", "must be > 0"));
    }

    let obs = &config.observability;
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> PoolConfig {
        let mut config = PoolConfig::default();
        config.pool.replicas = vec!["redis://10.0.0.2:6379".into(), "10.0.0.3:6379".into()];
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate_config(&valid()).is_ok());
    }

    #[test]
    fn test_no_replicas() {
        let mut config = valid();
        config.pool.replicas.clear();
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "pool.replicas");
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = valid();
        config.pool.primary = "http://10.0.0.1".into();
        config.pool.replicas.push("ftp://nope".into());
        config.circuit_breaker.failure_rate_threshold = 0.0;
        config.circuit_breaker.permitted_calls_in_half_open = 0;
        config.circuit_breaker.minimum_number_of_calls = Some(1000);

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "pool.primary",
                "pool.replicas[2]",
                "circuit_breaker.failure_rate_threshold",
                "circuit_breaker.minimum_number_of_calls",
                "circuit_breaker.permitted_calls_in_half_open",
            ]
        );
    }

    #[test]
    fn test_metrics_address_checked_only_when_enabled() {
        let mut config = valid();
        config.observability.metrics_address = "not-an-address".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors[0].field, "observability.metrics_address");
    }
}
