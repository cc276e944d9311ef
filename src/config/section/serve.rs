//! `[serve]` section configuration.
//!
//! ```toml
//! [serve]
//! interface = "127.0.0.1"     # Network interface (127.0.0.1 = localhost only)
//! port = 5277                 # HTTP port number
//! ```
//!
//! Use `interface = "0.0.0.0"` to make the server accessible from LAN.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use serde::{Deserialize, Serialize};

/// Development server settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServeConfig {
    /// Network interface to bind.
    pub interface: IpAddr,
    /// HTTP port number.
    pub port: u16,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            interface: IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)),
            port: 5277,
        }
    }
}

impl ServeConfig {
    pub const fn address(&self) -> SocketAddr {
        SocketAddr::new(self.interface, self.port)
    }
}
