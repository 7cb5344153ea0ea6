/// Backend connection contract consumed by the pool
use crate::core::ServerDescriptor;
use crate::error::BackendError;
use async_trait::async_trait;
use std::time::Duration;

/// A live connection to a single backend address.
///
/// The pool never looks inside a backend; it only closes it when the address
/// disappears and asks it for its server descriptor when building snapshots.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Close the connection. The pool calls this at most once per handle
    /// and ignores the result.
    async fn close(&self) -> Result<(), BackendError>;

    /// Describe this backend for load-balancer responses
    fn server(&self) -> ServerDescriptor;
}

/// Opens backend connections for a target
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Backend: Backend;

    /// Open a connection to `address` on behalf of `target`.
    ///
    /// `query_interval` is handed through unchanged from the pool so that
    /// transports can schedule their own load queries or keepalives.
    async fn connect(
        &self,
        target: &str,
        address: &str,
        query_interval: Duration,
    ) -> Result<Self::Backend, BackendError>;
}
