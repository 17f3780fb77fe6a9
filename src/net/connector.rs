//! TCP resource factory for store endpoints.
//!
//! # Responsibilities
//! - Parse an endpoint address (`redis://host:port`, `tcp://host:port`, `host:port`)
//! - Resolve and connect on every `create` call with a bounded connect timeout
//! - Hand the connected stream to the caller
//!
//! # Design Decisions
//! - Resolution happens per call so DNS changes are picked up
//! - Every resolved address is tried before giving up
//! - The connect timeout is the only deadline this crate imposes on I/O

use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

use url::Url;

use crate::pool::error::BoxError;
use crate::pool::factory::ResourceFactory;

/// Port used when the endpoint address omits one.
pub const DEFAULT_PORT: u16 = 6379;

/// Error type for connector operations.
#[derive(Debug)]
pub enum ConnectorError {
    /// The endpoint string could not be parsed.
    InvalidAddress(String),
    /// Name resolution failed.
    Resolve(std::io::Error),
    /// Resolution succeeded but produced no addresses.
    NoAddress(String),
    /// Every resolved address refused or timed out.
    Connect { addr: SocketAddr, source: std::io::Error },
}

impl std::fmt::Display for ConnectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectorError::InvalidAddress(s) => write!(f, "Invalid endpoint address: {}", s),
            ConnectorError::Resolve(e) => write!(f, "Failed to resolve endpoint: {}", e),
            ConnectorError::NoAddress(host) => write!(f, "No addresses found for {}", host),
            ConnectorError::Connect { addr, source } => write!(f, "Failed to connect to {}: {}", addr, source),
        }
    }
}

impl std::error::Error for ConnectorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConnectorError::Resolve(e) => Some(e),
            ConnectorError::Connect { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Opens a fresh TCP connection to one store endpoint per call.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    port: u16,
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, port: u16, connect_timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            connect_timeout,
        }
    }

    /// Build a connector from an endpoint address.
    pub fn parse(endpoint: &str, connect_timeout: Duration) -> Result<Self, ConnectorError> {
        let (host, port) = parse_endpoint(endpoint)?;
        Ok(Self::new(host, port, connect_timeout))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Connect, trying each resolved address in turn.
    pub fn connect(&self) -> Result<TcpStream, ConnectorError> {
        let addrs = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(ConnectorError::Resolve)?;

        let mut last_err = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.connect_timeout) {
                Ok(stream) => {
                    // Not fatal; the stream is still usable.
                    if let Err(e) = stream.set_nodelay(true) {
                        tracing::debug!(addr = %addr, error = %e, "Failed to set TCP_NODELAY");
                    }
                    tracing::trace!(addr = %addr, "Connected to endpoint");
                    return Ok(stream);
                }
                Err(source) => last_err = Some(ConnectorError::Connect { addr, source }),
            }
        }

        Err(last_err.unwrap_or_else(|| ConnectorError::NoAddress(self.host.clone())))
    }
}

impl ResourceFactory<TcpStream> for TcpConnector {
    fn create(&self) -> Result<TcpStream, BoxError> {
        self.connect().map_err(Into::into)
    }
}

/// Split an endpoint address into host and port.
pub fn parse_endpoint(endpoint: &str) -> Result<(String, u16), ConnectorError> {
    let trimmed = endpoint.trim();
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("tcp://{}", trimmed)
    };

    let url = Url::parse(&with_scheme).map_err(|e| ConnectorError::InvalidAddress(format!("{}: {}", endpoint, e)))?;

    match url.scheme() {
        "redis" | "tcp" => {}
        other => {
            return Err(ConnectorError::InvalidAddress(format!(
                "{}: unsupported scheme '{}'",
                endpoint, other
            )))
        }
    }

    let host = url
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ConnectorError::InvalidAddress(format!("{}: missing host", endpoint)))?;
    // IPv6 hosts come back bracketed; ToSocketAddrs wants them bare.
    let host = host.trim_start_matches('[').trim_end_matches(']').to_string();

    Ok((host, url.port().unwrap_or(DEFAULT_PORT)))
}
