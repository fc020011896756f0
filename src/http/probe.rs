//! Port availability probing.
//!
//! A probe binds a throwaway socket with `SO_REUSEADDR` set and drops it
//! immediately. The answer is advisory: another process may take the port
//! between the probe and the real bind, so callers must still handle a
//! failing bind.

use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};

use tokio::net::TcpSocket;

/// Resolve a configured bind address and port to a socket address.
///
/// An empty address binds all IPv4 interfaces.
pub fn bind_addr(address: &str, port: u16) -> io::Result<SocketAddr> {
    if address.is_empty() {
        return Ok(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port));
    }

    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }

    (address, port).to_socket_addrs()?.next().ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("{} did not resolve to any address", address),
        )
    })
}

/// Check whether `address:port` can currently be bound.
pub async fn is_port_available(address: &str, port: u16) -> bool {
    let addr = match bind_addr(address, port) {
        Ok(addr) => addr,
        Err(e) => {
            tracing::debug!(address, port, error = %e, "Cannot resolve probe address");
            return false;
        }
    };

    match probe(addr) {
        Ok(()) => true,
        Err(e) => {
            tracing::trace!(%addr, error = %e, "Port unavailable");
            false
        }
    }
}

fn probe(addr: SocketAddr) -> io::Result<()> {
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    // Sockets lingering in TIME_WAIT must not count as taken
    socket.set_reuseaddr(true)?;
    socket.bind(addr)?;
    Ok(())
}
