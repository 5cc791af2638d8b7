//! Server configuration

use crate::error::{Result, ServerError};
use std::net::SocketAddr;

/// Default port assignments
pub mod ports {
    /// Trader gRPC API
    pub const TRADER_GRPC: u16 = 5500;
}

/// Bind settings for the gRPC endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    /// Port 0 binds an ephemeral port
    pub grpc_port: u16,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, grpc_port: u16) -> Self {
        Self {
            host: host.into(),
            grpc_port,
        }
    }

    /// Resolve to a socket address
    pub fn grpc_addr(&self) -> Result<SocketAddr> {
        let raw = format!("{}:{}", self.host, self.grpc_port);
        let host = if self.host == "localhost" { "127.0.0.1" } else { self.host.as_str() };
        format!("{}:{}", host, self.grpc_port)
            .parse()
            .map_err(|_| ServerError::InvalidAddress(raw))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", ports::TRADER_GRPC)
    }
}
