//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use replicated_pool::pool::{BoxError, DiagnosticsSink, PoolError, ResourceFactory};
use replicated_pool::CircuitBreakerConfig;

/// Resource handed out by a scripted factory: the id of the endpoint that made it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conn(pub usize);

/// A factory whose health can be flipped at runtime and whose calls are counted.
#[derive(Debug, Clone)]
pub struct ScriptedFactory {
    pub id: usize,
    pub calls: Arc<AtomicUsize>,
    pub healthy: Arc<AtomicBool>,
}

impl ScriptedFactory {
    pub fn healthy(id: usize) -> Self {
        Self {
            id,
            calls: Arc::new(AtomicUsize::new(0)),
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn broken(id: usize) -> Self {
        let factory = Self::healthy(id);
        factory.set_healthy(false);
        factory
    }

    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ResourceFactory<Conn> for ScriptedFactory {
    fn create(&self) -> Result<Conn, BoxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.healthy.load(Ordering::SeqCst) {
            Ok(Conn(self.id))
        } else {
            Err(format!("endpoint {} refused connection", self.id).into())
        }
    }
}

/// Collects every replica failure reported by the router.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<(String, bool)>>,
}

impl RecordingSink {
    /// `(endpoint, was_unavailable)` pairs in report order.
    pub fn events(&self) -> Vec<(String, bool)> {
        self.events.lock().unwrap().clone()
    }
}

impl DiagnosticsSink for RecordingSink {
    fn replica_failure(&self, endpoint: &str, error: &PoolError) {
        self.events.lock().unwrap().push((endpoint.to_string(), error.is_unavailable()));
    }
}

/// Small window so tests trip breakers quickly.
pub fn breaker_config(window: usize) -> CircuitBreakerConfig {
    CircuitBreakerConfig {
        failure_rate_threshold: 0.5,
        sliding_window_size: window,
        minimum_number_of_calls: None,
        wait_duration_in_open: Duration::from_secs(30),
        permitted_calls_in_half_open: 1,
    }
}
