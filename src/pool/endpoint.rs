//! Failure-isolated endpoint.
//!
//! # Responsibilities
//! - Wrap one resource factory (the primary or a single replica)
//! - Own the circuit breaker for that factory
//! - Translate breaker outcomes into typed pool errors
//!
//! # Design Decisions
//! - Breakers are never shared; one endpoint degrading cannot trip another
//! - An open breaker answers immediately; no internal retry

use std::sync::Arc;

use serde::Serialize;

use crate::pool::error::{PoolError, PoolResult};
use crate::pool::factory::ResourceFactory;
use crate::resilience::circuit_breaker::{
    BreakerMetrics, CallError, CircuitBreaker, CircuitBreakerConfig, CircuitState,
};
use crate::resilience::clock::{Clock, SystemClock};

/// A resource factory guarded by its own circuit breaker.
pub struct Endpoint<R> {
    name: String,
    factory: Box<dyn ResourceFactory<R>>,
    breaker: CircuitBreaker,
}

impl<R> Endpoint<R> {
    /// Create an endpoint with a fresh breaker built from `config`.
    pub fn new<F>(name: impl Into<String>, factory: F, config: &CircuitBreakerConfig) -> PoolResult<Self>
    where
        F: ResourceFactory<R> + 'static,
    {
        Self::with_clock(name, factory, config, Arc::new(SystemClock))
    }

    /// Create an endpoint whose breaker reads time from `clock`.
    pub fn with_clock<F>(
        name: impl Into<String>,
        factory: F,
        config: &CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> PoolResult<Self>
    where
        F: ResourceFactory<R> + 'static,
    {
        let name = name.into();
        let breaker = CircuitBreaker::with_clock(name.clone(), config.clone(), clock)?;

        Ok(Self {
            name,
            factory: Box::new(factory),
            breaker,
        })
    }

    /// Obtain a resource from the factory, subject to the breaker.
    pub fn acquire(&self) -> PoolResult<R> {
        match self.breaker.call(|| self.factory.create()) {
            Ok(resource) => Ok(resource),
            Err(CallError::Rejected) => {
                tracing::debug!(endpoint = %self.name, "Call not permitted, circuit breaker open");
                Err(PoolError::EndpointUnavailable {
                    endpoint: self.name.clone(),
                })
            }
            Err(CallError::Failed(source)) => Err(PoolError::EndpointFailure {
                endpoint: self.name.clone(),
                source,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn snapshot(&self) -> EndpointSnapshot {
        EndpointSnapshot {
            name: self.name.clone(),
            breaker: self.breaker.metrics(),
        }
    }
}

impl<R> std::fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("state", &self.breaker.state())
            .finish()
    }
}

/// Serializable view of one endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointSnapshot {
    pub name: String,
    #[serde(flatten)]
    pub breaker: BreakerMetrics,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use crate::resilience::clock::ManualClock;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_rate_threshold: 0.5,
            sliding_window_size: 2,
            minimum_number_of_calls: None,
            wait_duration_in_open: Duration::from_secs(30),
            permitted_calls_in_half_open: 1,
        }
    }

    #[test]
    fn test_acquire_success() {
        let endpoint = Endpoint::new("cache-primary", || Ok::<_, std::io::Error>("conn"), &config()).unwrap();
        assert_eq!(endpoint.acquire().unwrap(), "conn");
        assert_eq!(endpoint.snapshot().breaker.successful_calls, 1);
    }

    #[test]
    fn test_failure_is_wrapped_and_recorded() {
        let endpoint = Endpoint::new("cache-replica-0", || Err::<(), _>("connection refused"), &config()).unwrap();

        let err = endpoint.acquire().unwrap_err();
        match &err {
            PoolError::EndpointFailure { endpoint, source } => {
                assert_eq!(endpoint, "cache-replica-0");
                assert_eq!(source.to_string(), "connection refused");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(endpoint.snapshot().breaker.failed_calls, 1);
    }

    #[test]
    fn test_open_breaker_skips_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let clock = ManualClock::new();
        let endpoint = Endpoint::with_clock(
            "cache-replica-1",
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>("down")
            },
            &config(),
            Arc::new(clock.clone()),
        )
        .unwrap();

        let _ = endpoint.acquire();
        let _ = endpoint.acquire();
        assert_eq!(endpoint.state(), CircuitState::Open);

        let err = endpoint.acquire().unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(endpoint.snapshot().breaker.not_permitted_calls, 1);

        clock.advance(Duration::from_secs(30));
        let _ = endpoint.acquire();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(endpoint.state(), CircuitState::Open);
    }

    #[test]
    fn test_invalid_breaker_config() {
        let mut cfg = config();
        cfg.failure_rate_threshold = 0.0;
        let result = Endpoint::new("bad", || Ok::<_, std::io::Error>(()), &cfg);
        assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
    }
}
