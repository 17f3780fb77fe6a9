//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Breakers and the router produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (breaker state gauges, call and failover counters)
//!
//! Consumers:
//!     → stdout log lines
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
