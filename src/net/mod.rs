//! Network subsystem.
//!
//! # Data Flow
//! ```text
//! endpoint address (config)
//!     → connector.rs (parse host/port)
//!     → ResourceFactory::create → resolve → TcpStream::connect_timeout
//!     → stream handed to caller
//! ```

pub mod connector;

pub use connector::{ConnectorError, TcpConnector};
