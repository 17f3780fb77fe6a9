//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → PoolConfig (validated, immutable)
//!     → CircuitBreakerSettings::to_breaker_config → router construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; replica membership never changes at runtime
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{CircuitBreakerSettings, EndpointsConfig, ObservabilityConfig, PoolConfig, ProbeConfig};
