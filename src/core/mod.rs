/// Core abstractions: address sets, backend contracts and the backend pool
pub mod address_set;
pub mod backend;
pub mod pool;
pub mod tcp;

pub use address_set::AddressSet;
pub use backend::{Backend, Connector};
pub use pool::{BackendPool, ReconcileSummary};
pub use tcp::{TcpBackend, TcpConnector};

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

/// Server record handed to load-balancer clients.
///
/// Mirrors the grpclb `Server` message. The pool copies it verbatim into
/// snapshots and never interprets it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ServerDescriptor {
    /// Raw IP octets in network byte order, 4 bytes for IPv4, 16 for IPv6
    pub ip_address: Vec<u8>,
    pub port: i32,
    /// Opaque token the client attaches to requests sent to this server
    pub load_balance_token: String,
    pub drop_for_rate_limiting: bool,
    pub drop_for_load_balancing: bool,
}

impl ServerDescriptor {
    pub fn new(addr: SocketAddr, load_balance_token: String) -> Self {
        let ip_address = match addr.ip() {
            IpAddr::V4(ip) => ip.octets().to_vec(),
            IpAddr::V6(ip) => ip.octets().to_vec(),
        };

        Self {
            ip_address,
            port: i32::from(addr.port()),
            load_balance_token,
            drop_for_rate_limiting: false,
            drop_for_load_balancing: false,
        }
    }

    /// Decode the descriptor back into a socket address, if it carries one
    pub fn socket_addr(&self) -> Option<SocketAddr> {
        let port = u16::try_from(self.port).ok()?;
        let ip = match self.ip_address.len() {
            4 => {
                let octets: [u8; 4] = self.ip_address.as_slice().try_into().ok()?;
                IpAddr::V4(Ipv4Addr::from(octets))
            }
            16 => {
                let octets: [u8; 16] = self.ip_address.as_slice().try_into().ok()?;
                IpAddr::V6(Ipv6Addr::from(octets))
            }
            _ => return None,
        };
        Some(SocketAddr::new(ip, port))
    }
}

impl fmt::Display for ServerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket_addr() {
            Some(addr) => write!(f, "{}", addr)?,
            None => write!(f, "<opaque:{}b>:{}", self.ip_address.len(), self.port)?,
        }
        if !self.load_balance_token.is_empty() {
            write!(f, " token={}", self.load_balance_token)?;
        }
        Ok(())
    }
}
