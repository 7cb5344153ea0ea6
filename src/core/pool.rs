/// Backend pool for a single load-balanced target
///
/// The pool keeps one live backend per address and reconciles that registry
/// against address lists produced by a resolver. Reconciliation closes stale
/// backends outside the lock and connects new ones concurrently, inserting
/// each backend as soon as it connects so snapshot readers see progress
/// incrementally.
use crate::core::{AddressSet, Backend, Connector, ServerDescriptor};
use crate::error::{ConnectFailure, PoolError, PoolResult};
use futures::future::join_all;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// Outcome of a successful reconciliation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileSummary {
    /// Addresses that were connected and inserted, sorted
    pub added: Vec<String>,
    /// Addresses that were dropped and closed, sorted
    pub removed: Vec<String>,
}

impl ReconcileSummary {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// Registry of live backends for one target
pub struct BackendPool<C: Connector> {
    target: String,
    connector: C,
    query_interval: Duration,
    backends: RwLock<HashMap<String, C::Backend>>,
    /// Present only when overlapping reconciliations must run one at a time
    reconcile_lock: Option<Mutex<()>>,
}

impl<C: Connector> BackendPool<C> {
    /// Create an empty pool. Overlapping `reconcile` calls are not serialized
    /// against each other; see [`BackendPool::serialized`].
    pub fn new(target: impl Into<String>, connector: C, query_interval: Duration) -> Self {
        Self {
            target: target.into(),
            connector,
            query_interval,
            backends: RwLock::new(HashMap::new()),
            reconcile_lock: None,
        }
    }

    /// Create an empty pool whose `reconcile` calls never overlap.
    ///
    /// Snapshots still proceed while a reconciliation is in flight.
    pub fn serialized(target: impl Into<String>, connector: C, query_interval: Duration) -> Self {
        Self {
            reconcile_lock: Some(Mutex::new(())),
            ..Self::new(target, connector, query_interval)
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn query_interval(&self) -> Duration {
        self.query_interval
    }

    pub fn is_serialized(&self) -> bool {
        self.reconcile_lock.is_some()
    }

    /// Number of tracked backends
    pub async fn len(&self) -> usize {
        self.backends.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.backends.read().await.is_empty()
    }

    /// Tracked addresses in sorted order
    pub async fn addresses(&self) -> Vec<String> {
        let backends = self.backends.read().await;
        let mut addrs: Vec<String> = backends.keys().cloned().collect();
        addrs.sort_unstable();
        addrs
    }

    /// Server descriptors of every tracked backend, in no particular order
    pub async fn snapshot(&self) -> Vec<ServerDescriptor> {
        let backends = self.backends.read().await;
        backends.values().map(Backend::server).collect()
    }

    /// Build an address set from `addrs` and reconcile against it
    pub async fn update(&self, addrs: Vec<String>) -> PoolResult<ReconcileSummary> {
        self.reconcile(&AddressSet::new(addrs)).await
    }

    /// Bring the pool in line with `addrs`.
    ///
    /// Backends whose address is gone are removed and closed, close errors
    /// are only logged. Every new address gets exactly one connection
    /// attempt; all attempts run concurrently and finish before this returns.
    /// If any attempt fails the call reports every failure, but backends that
    /// did connect stay in the pool.
    ///
    /// # Cancellation
    ///
    /// Not cancel safe. Dropping the future after the stale backends were
    /// detached drops them without calling `close`, and abandons connection
    /// attempts still in flight. Run it to completion, e.g. in its own task,
    /// rather than racing it in `select!` or under `timeout`.
    pub async fn reconcile(&self, addrs: &AddressSet) -> PoolResult<ReconcileSummary> {
        let _serial = match &self.reconcile_lock {
            Some(lock) => Some(lock.lock().await),
            None => None,
        };

        let (removed, added) = self.diff(addrs).await;

        if !removed.is_empty() || !added.is_empty() {
            info!(
                service = %self.target,
                removed = removed.len(),
                added = added.len(),
                "Reconciling backends"
            );
        }

        let mut removed_addrs = Vec::with_capacity(removed.len());
        for (addr, backend) in removed {
            close_backend(&self.target, &addr, backend).await;
            removed_addrs.push(addr);
        }
        removed_addrs.sort_unstable();

        if added.is_empty() {
            return Ok(ReconcileSummary {
                added: Vec::new(),
                removed: removed_addrs,
            });
        }

        let failures = self.connect_all(&added).await;
        if !failures.is_empty() {
            return Err(PoolError::Connect {
                target: self.target.clone(),
                failures,
            });
        }

        Ok(ReconcileSummary {
            added,
            removed: removed_addrs,
        })
    }

    /// Close and forget every backend
    pub async fn shutdown(&self) -> PoolResult<ReconcileSummary> {
        info!(service = %self.target, "Shutting down backend pool");
        self.reconcile(&AddressSet::default()).await
    }

    /// Detach stale backends and work out which addresses are new.
    /// The write lock is held only for this scan.
    async fn diff(&self, addrs: &AddressSet) -> (Vec<(String, C::Backend)>, Vec<String>) {
        let mut backends = self.backends.write().await;

        let stale: Vec<String> = backends
            .keys()
            .filter(|addr| !addrs.contains(addr.as_str()))
            .cloned()
            .collect();
        let removed = stale
            .into_iter()
            .filter_map(|addr| backends.remove_entry(&addr))
            .collect();

        // `addrs` is sorted, so duplicates are adjacent
        let mut added: Vec<String> = addrs
            .iter()
            .filter(|addr| !backends.contains_key(addr.as_str()))
            .cloned()
            .collect();
        added.dedup();

        (removed, added)
    }

    /// Connect every address concurrently, returning failures sorted by address
    async fn connect_all(&self, addrs: &[String]) -> Vec<ConnectFailure> {
        let attempts = addrs.iter().map(|addr| self.connect(addr));

        let mut failures: Vec<ConnectFailure> = join_all(attempts)
            .await
            .into_iter()
            .filter_map(Result::err)
            .collect();
        failures.sort_by(|a, b| a.address.cmp(&b.address));
        failures
    }

    async fn connect(&self, addr: &str) -> Result<(), ConnectFailure> {
        debug!(service = %self.target, address = %addr, "Connecting backend");

        let backend = match self
            .connector
            .connect(&self.target, addr, self.query_interval)
            .await
        {
            Ok(backend) => backend,
            Err(error) => {
                warn!(service = %self.target, address = %addr, error = %error, "Backend connect failed");
                return Err(ConnectFailure {
                    address: addr.to_string(),
                    error,
                });
            }
        };

        let displaced = {
            let mut backends = self.backends.write().await;
            backends.insert(addr.to_string(), backend)
        };
        debug!(service = %self.target, address = %addr, "Backend connected");

        // An overlapping reconcile connected the same address first
        if let Some(previous) = displaced {
            close_backend(&self.target, addr, previous).await;
        }
        Ok(())
    }
}

async fn close_backend<B: Backend>(target: &str, addr: &str, backend: B) {
    match backend.close().await {
        Ok(()) => debug!(service = %target, address = %addr, "Backend closed"),
        Err(error) => {
            warn!(service = %target, address = %addr, error = %error, "Ignoring backend close error")
        }
    }
}
