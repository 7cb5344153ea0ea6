/// Plain TCP transport for backends
///
/// Dials each backend address once and keeps the stream open for as long as
/// the address stays in the pool. The query interval becomes the TCP
/// keepalive idle time so dead peers are noticed by the kernel.
use crate::core::{Backend, Connector, ServerDescriptor};
use crate::error::BackendError;
use crate::utils::split_host_port;
use async_trait::async_trait;
use socket2::{SockRef, TcpKeepalive};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{lookup_host, TcpStream};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Connector that opens one TCP stream per backend address
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    async fn resolve(address: &str) -> Result<SocketAddr, BackendError> {
        split_host_port(address)
            .map_err(|reason| BackendError::invalid_address(address.to_string(), reason))?;

        let mut addrs = lookup_host(address).await.map_err(|e| BackendError::Connect {
            address: address.to_string(),
            source: e,
        })?;
        addrs.next().ok_or_else(|| BackendError::Resolve {
            address: address.to_string(),
        })
    }

    /// Configure the backend stream for a long-lived idle connection.
    /// Keepalive is left at the system default when `query_interval` is zero.
    fn configure_stream(stream: &TcpStream, query_interval: Duration) -> std::io::Result<()> {
        stream.set_nodelay(true)?;
        if !query_interval.is_zero() {
            let keepalive = TcpKeepalive::new().with_time(query_interval);
            SockRef::from(stream).set_tcp_keepalive(&keepalive)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Backend = TcpBackend;

    async fn connect(
        &self,
        target: &str,
        address: &str,
        query_interval: Duration,
    ) -> Result<TcpBackend, BackendError> {
        let peer = Self::resolve(address).await?;

        let stream = match timeout(self.connect_timeout, TcpStream::connect(peer)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(BackendError::Connect {
                    address: address.to_string(),
                    source: e,
                })
            }
            Err(_) => {
                return Err(BackendError::Timeout {
                    address: address.to_string(),
                    timeout: self.connect_timeout,
                })
            }
        };

        if let Err(e) = Self::configure_stream(&stream, query_interval) {
            warn!(
                service = %target,
                address = %address,
                error = %e,
                "Failed to configure backend stream"
            );
        }

        debug!(service = %target, address = %address, peer = %peer, "Connected to backend");
        Ok(TcpBackend {
            address: address.to_string(),
            peer,
            token: target.to_string(),
            stream: Mutex::new(Some(stream)),
        })
    }
}

/// An open TCP connection to one backend
#[derive(Debug)]
pub struct TcpBackend {
    address: String,
    peer: SocketAddr,
    token: String,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpBackend {
    /// The address string this backend was opened for
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    pub async fn is_closed(&self) -> bool {
        self.stream.lock().await.is_none()
    }

    /// Whether `TCP_NODELAY` is set on the open stream
    pub async fn nodelay(&self) -> Option<bool> {
        let stream = self.stream.lock().await;
        stream.as_ref().and_then(|s| s.nodelay().ok())
    }
}

#[async_trait]
impl Backend for TcpBackend {
    async fn close(&self) -> Result<(), BackendError> {
        let stream = self.stream.lock().await.take();
        let mut stream = stream.ok_or_else(|| BackendError::Closed {
            address: self.address.clone(),
        })?;

        stream.shutdown().await.map_err(|e| BackendError::Connect {
            address: self.address.clone(),
            source: e,
        })
    }

    fn server(&self) -> ServerDescriptor {
        ServerDescriptor::new(self.peer, self.token.clone())
    }
}
