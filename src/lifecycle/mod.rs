//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Ctrl-C → Shutdown::trigger → probe monitor exits → process exits
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
