//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Endpoint acquire:
//!     → circuit_breaker.rs (permit or reject)
//!     → resource factory call
//!     → circuit_breaker.rs (record outcome, maybe transition)
//! ```
//!
//! # Design Decisions
//! - Breakers fail fast; no waiting and no internal retry
//! - Time is injected through clock.rs so open-state waits are testable
//! - Timeouts belong to the resource factory, not to this layer

pub mod circuit_breaker;
pub mod clock;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use clock::{Clock, ManualClock, SystemClock};
