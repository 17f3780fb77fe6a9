//! Replicated resource router.
//!
//! # Responsibilities
//! - Route writes to the single primary endpoint
//! - Rotate reads across replicas, failing over past unhealthy ones
//! - Report every swallowed replica failure to the diagnostics sink
//!
//! # Design Decisions
//! - Replica membership is fixed at construction
//! - The rotation cursor is the only shared mutable state outside the breakers
//! - Writes never fail over; replicas are read-only

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::observability::metrics;
use crate::pool::diagnostics::{DiagnosticsSink, TracingSink};
use crate::pool::endpoint::{Endpoint, EndpointSnapshot};
use crate::pool::error::{PoolError, PoolResult};
use crate::pool::factory::ResourceFactory;
use crate::resilience::circuit_breaker::CircuitBreakerConfig;
use crate::resilience::clock::{Clock, SystemClock};

/// Primary/replica router with per-endpoint failure isolation.
pub struct ReplicatedRouter<R> {
    name: String,
    primary: Endpoint<R>,
    replicas: Vec<Endpoint<R>>,
    /// Monotonic rotation counter; only `cursor % replicas.len()` matters.
    cursor: AtomicUsize,
    diagnostics: Arc<dyn DiagnosticsSink>,
}

impl<R> ReplicatedRouter<R> {
    /// Build a router over one primary and at least one replica.
    ///
    /// `config` is a template: every endpoint gets its own breaker.
    pub fn new<W, P>(
        name: impl Into<String>,
        primary: W,
        replicas: Vec<P>,
        config: &CircuitBreakerConfig,
    ) -> PoolResult<Self>
    where
        W: ResourceFactory<R> + 'static,
        P: ResourceFactory<R> + 'static,
    {
        Self::with_clock(name, primary, replicas, config, Arc::new(SystemClock))
    }

    /// Same as [`ReplicatedRouter::new`] with an explicit breaker time source.
    pub fn with_clock<W, P>(
        name: impl Into<String>,
        primary: W,
        replicas: Vec<P>,
        config: &CircuitBreakerConfig,
        clock: Arc<dyn Clock>,
    ) -> PoolResult<Self>
    where
        W: ResourceFactory<R> + 'static,
        P: ResourceFactory<R> + 'static,
    {
        let name = name.into();
        if replicas.is_empty() {
            return Err(PoolError::InvalidConfiguration(
                "there must be at least one replica".to_string(),
            ));
        }

        let primary = Endpoint::with_clock(format!("{name}-primary"), primary, config, clock.clone())?;
        let replicas = replicas
            .into_iter()
            .enumerate()
            .map(|(i, factory)| {
                Endpoint::with_clock(format!("{name}-replica-{i}"), factory, config, clock.clone())
            })
            .collect::<PoolResult<Vec<_>>>()?;

        tracing::info!(pool = %name, replicas = replicas.len(), "Replicated router initialized");

        Ok(Self {
            name,
            primary,
            replicas,
            cursor: AtomicUsize::new(0),
            diagnostics: Arc::new(TracingSink),
        })
    }

    /// Replace the sink that receives replica failures.
    pub fn with_diagnostics(mut self, sink: Arc<dyn DiagnosticsSink>) -> Self {
        self.diagnostics = sink;
        self
    }

    /// Obtain a resource from the primary.
    pub fn acquire_write(&self) -> PoolResult<R> {
        self.primary.acquire()
    }

    /// Obtain a resource from the next healthy replica.
    ///
    /// Tries at most one replica per configured replica, in rotation order.
    /// In the worst case every replica is attempted sequentially, so callers
    /// needing a bound on total time must impose their own deadline.
    pub fn acquire_read(&self) -> PoolResult<R> {
        let count = self.replicas.len();

        for _ in 0..count {
            let index = self.cursor.fetch_add(1, Ordering::Relaxed) % count;
            let replica = &self.replicas[index];

            match replica.acquire() {
                Ok(resource) => {
                    tracing::trace!(pool = %self.name, replica = index, "Read routed");
                    return Ok(resource);
                }
                Err(e) => self.diagnostics.replica_failure(replica.name(), &e),
            }
        }

        metrics::record_read_exhausted(&self.name);
        Err(PoolError::AllReplicasUnavailable { attempts: count })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn replica_count(&self) -> usize {
        self.replicas.len()
    }

    pub fn primary(&self) -> &Endpoint<R> {
        &self.primary
    }

    pub fn replicas(&self) -> &[Endpoint<R>] {
        &self.replicas
    }

    /// Breaker state and counters for every endpoint.
    pub fn snapshot(&self) -> RouterSnapshot {
        RouterSnapshot {
            name: self.name.clone(),
            primary: self.primary.snapshot(),
            replicas: self.replicas.iter().map(Endpoint::snapshot).collect(),
        }
    }
}

impl<R> std::fmt::Debug for ReplicatedRouter<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicatedRouter")
            .field("name", &self.name)
            .field("primary", &self.primary)
            .field("replicas", &self.replicas)
            .field("cursor", &self.cursor.load(Ordering::Relaxed))
            .finish()
    }
}

/// Serializable view of the whole router.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouterSnapshot {
    pub name: String,
    pub primary: EndpointSnapshot,
    pub replicas: Vec<EndpointSnapshot>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    type Factory = Box<dyn Fn() -> Result<usize, String> + Send + Sync>;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            sliding_window_size: 4,
            wait_duration_in_open: Duration::from_secs(60),
            permitted_calls_in_half_open: 1,
            ..CircuitBreakerConfig::default()
        }
    }

    fn healthy(id: usize) -> Factory {
        Box::new(move || Ok(id))
    }

    fn broken() -> Factory {
        Box::new(|| Err("connection refused".to_string()))
    }

    #[test]
    fn test_round_robin() {
        let router = ReplicatedRouter::new(
            "cache",
            healthy(100),
            vec![healthy(0), healthy(1)],
            &config(),
        )
        .unwrap();

        assert_eq!(router.acquire_read().unwrap(), 0);
        assert_eq!(router.acquire_read().unwrap(), 1);
        assert_eq!(router.acquire_read().unwrap(), 0);
    }

    #[test]
    fn test_write_goes_to_primary() {
        let router = ReplicatedRouter::new("cache", healthy(100), vec![healthy(0)], &config()).unwrap();
        assert_eq!(router.acquire_write().unwrap(), 100);
    }

    #[test]
    fn test_failover_skips_broken_replica() {
        let router = ReplicatedRouter::new(
            "cache",
            healthy(100),
            vec![broken(), healthy(1)],
            &config(),
        )
        .unwrap();

        for _ in 0..4 {
            assert_eq!(router.acquire_read().unwrap(), 1);
        }
    }

    #[test]
    fn test_all_replicas_failed() {
        let router = ReplicatedRouter::new(
            "cache",
            healthy(100),
            vec![broken(), broken(), broken()],
            &config(),
        )
        .unwrap();

        let err = router.acquire_read().unwrap_err();
        assert!(matches!(err, PoolError::AllReplicasUnavailable { attempts: 3 }));
    }

    #[test]
    fn test_empty_replicas_rejected() {
        let result = ReplicatedRouter::new("cache", healthy(100), Vec::<Factory>::new(), &config());
        assert!(matches!(result, Err(PoolError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_endpoint_names() {
        let router = ReplicatedRouter::new("cache", healthy(100), vec![healthy(0), healthy(1)], &config()).unwrap();
        let snapshot = router.snapshot();
        assert_eq!(snapshot.primary.name, "cache-primary");
        assert_eq!(snapshot.replicas[1].name, "cache-replica-1");
        assert_eq!(router.replica_count(), 2);
    }
}
