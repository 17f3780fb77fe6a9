//! Diagnostics sink for replica failures during reads.

use crate::observability::metrics;
use crate::pool::error::PoolError;

/// Receives every replica failure swallowed by the read failover loop.
///
/// Reporting is fire-and-forget; a sink must not panic or block.
pub trait DiagnosticsSink: Send + Sync + std::fmt::Debug {
    fn replica_failure(&self, endpoint: &str, error: &PoolError);
}

/// Default sink: an error log line and a failover counter.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn replica_failure(&self, endpoint: &str, error: &PoolError) {
        tracing::error!(endpoint = %endpoint, error = %error, "Failure obtaining read replica resource");
        metrics::record_replica_failover(endpoint);
    }
}
