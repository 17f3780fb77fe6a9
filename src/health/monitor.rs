//! Periodic probing of the primary and replicas.
//!
//! # Responsibilities
//! - Drive one write and one read acquisition per tick
//! - Log outcomes and breaker states so degradation is visible without traffic
//!
//! # Design Decisions
//! - Factories are synchronous, so acquisitions run on the blocking pool
//! - Acquired resources are dropped immediately; the probe only checks reachability
//! - The probe goes through the router, so its outcomes feed the same breakers

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::time;

use crate::pool::error::PoolResult;
use crate::pool::router::ReplicatedRouter;

/// Result of one probe round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    /// `None` when the write path succeeded, otherwise the error text.
    pub write_error: Option<String>,
    /// `None` when the read path succeeded, otherwise the error text.
    pub read_error: Option<String>,
}

impl ProbeReport {
    pub fn is_healthy(&self) -> bool {
        self.write_error.is_none() && self.read_error.is_none()
    }
}

pub struct ProbeMonitor<R> {
    router: Arc<ReplicatedRouter<R>>,
    interval: Duration,
}

impl<R: 'static> ProbeMonitor<R> {
    pub fn new(router: Arc<ReplicatedRouter<R>>, interval: Duration) -> Self {
        Self { router, interval }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(
            pool = %self.router.name(),
            interval_ms = self.interval.as_millis() as u64,
            "Probe monitor starting"
        );

        let mut ticker = time::interval(self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe_once().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Probe monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Run one write and one read acquisition.
    pub async fn probe_once(&self) -> ProbeReport {
        let router = self.router.clone();
        let write = run_blocking(move || router.acquire_write().map(drop)).await;
        let router = self.router.clone();
        let read = run_blocking(move || router.acquire_read().map(drop)).await;

        match &write {
            Ok(()) => tracing::debug!(pool = %self.router.name(), "Write probe succeeded"),
            Err(e) => tracing::warn!(pool = %self.router.name(), error = %e, "Write probe failed"),
        }
        match &read {
            Ok(()) => tracing::debug!(pool = %self.router.name(), "Read probe succeeded"),
            Err(e) => tracing::warn!(pool = %self.router.name(), error = %e, "Read probe failed"),
        }

        for endpoint in std::iter::once(self.router.primary()).chain(self.router.replicas()) {
            tracing::debug!(endpoint = %endpoint.name(), state = %endpoint.state(), "Endpoint status");
        }

        ProbeReport {
            write_error: write.err(),
            read_error: read.err(),
        }
    }
}

async fn run_blocking<F>(f: F) -> Result<(), String>
where
    F: FnOnce() -> PoolResult<()> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("probe task failed: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::resilience::circuit_breaker::CircuitBreakerConfig;

    type Factory = Box<dyn Fn() -> Result<(), String> + Send + Sync>;

    fn router(primary_ok: bool, replica_ok: bool) -> Arc<ReplicatedRouter<()>> {
        let make = |ok: bool| -> Factory {
            Box::new(move || if ok { Ok(()) } else { Err("refused".to_string()) })
        };
        Arc::new(
            ReplicatedRouter::new(
                "probe",
                make(primary_ok),
                vec![make(replica_ok), make(replica_ok)],
                &CircuitBreakerConfig::default(),
            )
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_probe_healthy() {
        let monitor = ProbeMonitor::new(router(true, true), Duration::from_millis(10));
        let report = monitor.probe_once().await;
        assert!(report.is_healthy());
    }

    #[tokio::test]
    async fn test_probe_reports_failures() {
        let monitor = ProbeMonitor::new(router(false, false), Duration::from_millis(10));
        let report = monitor.probe_once().await;
        assert!(report.write_error.unwrap().contains("probe-primary"));
        assert!(report.read_error.unwrap().contains("all read replicas failed"));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let router = router(true, true);
        let monitor = ProbeMonitor::new(router.clone(), Duration::from_millis(10));
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(monitor.run(shutdown.subscribe()));

        time::sleep(Duration::from_millis(50)).await;
        shutdown.trigger();
        time::timeout(Duration::from_secs(2), handle).await.unwrap().unwrap();

        assert!(router.primary().snapshot().breaker.successful_calls >= 1);
    }
}
