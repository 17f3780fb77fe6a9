//! Health probing subsystem.
//!
//! # Data Flow
//! ```text
//! Periodic timer (monitor.rs)
//!     → acquire_write / acquire_read through the router
//!     → outcomes recorded by each endpoint's breaker
//!     → report + log lines
//! ```
//!
//! # Design Decisions
//! - No separate health state: the breakers are the health state
//! - Probing is optional; routing works without it

pub mod monitor;

pub use monitor::{ProbeMonitor, ProbeReport};
