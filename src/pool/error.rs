//! Error types for endpoint and router operations.

use thiserror::Error;

use crate::resilience::circuit_breaker::InvalidBreakerConfig;

/// Boxed error produced by a resource factory.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced to callers of the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The router could not be built.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The endpoint's breaker is open; no connection was attempted.
    #[error("endpoint {endpoint} unavailable: circuit breaker is open")]
    EndpointUnavailable { endpoint: String },

    /// The resource factory itself failed.
    #[error("endpoint {endpoint} failed: {source}")]
    EndpointFailure {
        endpoint: String,
        #[source]
        source: BoxError,
    },

    /// Every replica tried during one read failed.
    #[error("all read replicas failed ({attempts} attempts)")]
    AllReplicasUnavailable { attempts: usize },
}

impl PoolError {
    /// True when the failure was a fast rejection rather than a real attempt.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, PoolError::EndpointUnavailable { .. })
    }

    /// Name of the endpoint this error is about, if it concerns a single one.
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            PoolError::EndpointUnavailable { endpoint } | PoolError::EndpointFailure { endpoint, .. } => {
                Some(endpoint.as_str())
            }
            _ => None,
        }
    }
}

impl From<InvalidBreakerConfig> for PoolError {
    fn from(e: InvalidBreakerConfig) -> Self {
        PoolError::InvalidConfiguration(e.0)
    }
}

/// Result type for pool operations.
pub type PoolResult<T> = Result<T, PoolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = PoolError::EndpointUnavailable { endpoint: "cache-replica-1".into() };
        assert_eq!(err.to_string(), "endpoint cache-replica-1 unavailable: circuit breaker is open");
        assert!(err.is_unavailable());
        assert_eq!(err.endpoint(), Some("cache-replica-1"));

        let err = PoolError::AllReplicasUnavailable { attempts: 3 };
        assert!(err.to_string().contains("3 attempts"));
        assert_eq!(err.endpoint(), None);
    }

    #[test]
    fn test_failure_keeps_source() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = PoolError::EndpointFailure {
            endpoint: "cache-primary".into(),
            source: Box::new(io),
        };
        assert!(!err.is_unavailable());
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "refused");
    }

    #[test]
    fn test_from_breaker_config() {
        let err: PoolError = InvalidBreakerConfig("window".into()).into();
        assert!(matches!(err, PoolError::InvalidConfiguration(msg) if msg == "window"));
    }
}
