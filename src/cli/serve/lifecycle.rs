//! Server lifecycle management.

use crate::log;
use anyhow::{Context, Result, anyhow};
use std::{net::SocketAddr, sync::Arc};
use tiny_http::Server;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(base: SocketAddr) -> Result<(Server, SocketAddr)> {
    let (interface, base_port) = (base.ip(), base.port());
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }
    Err(anyhow!(
        "failed to bind after {} attempts (ports {}-{}): {}",
        MAX_PORT_RETRIES,
        base_port,
        base_port.saturating_add(MAX_PORT_RETRIES - 1),
        last_error.map(|e| e.to_string()).unwrap_or_default()
    ))
}

/// Unblock the request loop on Ctrl+C so the session can be finalized.
pub fn register_shutdown(server: Arc<Server>) -> Result<()> {
    ctrlc::set_handler(move || {
        eprintln!();
        log!("serve"; "shutting down");
        server.unblock();
    })
    .context("failed to set Ctrl+C handler")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_bind_retries_next_port() {
        let localhost = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let taken = std::net::TcpListener::bind((localhost, 0)).unwrap();
        let port = taken.local_addr().unwrap().port();

        let (_server, addr) = bind_with_retry(SocketAddr::new(localhost, port)).unwrap();
        assert_eq!(addr.ip(), localhost);
        assert!(addr.port() > port);
    }
}
