//! Replicated pool subsystem.
//!
//! # Data Flow
//! ```text
//! acquire_write()
//!     → router.rs → primary endpoint.rs → breaker → factory.rs
//!
//! acquire_read()
//!     → router.rs (cursor picks replica i)
//!     → endpoint.rs (replica i) → breaker → factory.rs
//!     → on failure: diagnostics.rs, then replica i+1 ... up to N attempts
//!     → error.rs AllReplicasUnavailable if every attempt failed
//! ```

pub mod diagnostics;
pub mod endpoint;
pub mod error;
pub mod factory;
pub mod router;

pub use diagnostics::{DiagnosticsSink, TracingSink};
pub use endpoint::{Endpoint, EndpointSnapshot};
pub use error::{BoxError, PoolError, PoolResult};
pub use factory::ResourceFactory;
pub use router::{ReplicatedRouter, RouterSnapshot};
