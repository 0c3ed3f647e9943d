//! Gateway configuration.

use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};

/// Default HTTP port.
pub const DEFAULT_PORT: u16 = 8080;

/// Gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Address the HTTP listener binds to.
    pub bind_addr: SocketAddr,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
        }
    }
}

impl GatewayConfig {
    /// Bind to `addr` instead.
    pub fn with_bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }
}
