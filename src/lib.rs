//! Failure-isolated access to a replicated key-value store.
//!
//! Writes go to a single primary; reads rotate across a fixed set of
//! replicas and fail over past unhealthy ones. Every endpoint is guarded by
//! its own circuit breaker so a struggling backend answers fast instead of
//! absorbing caller time.
//!
//! ```
//! use replicated_pool::{CircuitBreakerConfig, ReplicatedRouter};
//!
//! let router = ReplicatedRouter::new(
//!     "cache",
//!     || Ok::<_, std::io::Error>("primary"),
//!     vec![|| Ok::<_, std::io::Error>("replica")],
//!     &CircuitBreakerConfig::default(),
//! )
//! .unwrap();
//!
//! assert_eq!(router.acquire_write().unwrap(), "primary");
//! assert_eq!(router.acquire_read().unwrap(), "replica");
//! ```

pub mod config;
pub mod health;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod pool;
pub mod resilience;

pub use config::PoolConfig;
pub use pool::{Endpoint, PoolError, ReplicatedRouter, ResourceFactory};
pub use resilience::{CircuitBreakerConfig, CircuitState};
