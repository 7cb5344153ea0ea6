pub mod config;
pub mod error;
/// grpclb-backends - backend pool reconciliation for client-side load balancing
///
/// A balancer serves one logical target. It keeps a pool with one live
/// connection per backend address, reconciles that pool whenever the address
/// list changes, and hands out a snapshot of connected servers to load
/// balancer clients.
pub mod core;
pub mod utils;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::{BackendPool, ReconcileSummary, ServerDescriptor, TcpConnector};
use crate::error::{ErrorSeverity, PoolError, PoolResult};
use crate::utils::format_duration;

/// Balancer for a single target backed by plain TCP connections.
///
/// The address list comes from the configuration; when a config path is set
/// the file is re-read on every refresh so edits to `backends.addresses`
/// take effect without a restart.
pub struct Balancer {
    config: Config,
    config_path: Option<PathBuf>,
    pool: Arc<BackendPool<TcpConnector>>,
}

impl Balancer {
    /// Create a balancer from a validated configuration
    pub fn new(config: Config) -> Self {
        let connector = TcpConnector::new(config.backends.connect_timeout());
        let target = config.balancer.target.clone();
        let query_interval = config.balancer.query_interval();

        let pool = if config.balancer.serialize_reconcile {
            BackendPool::serialized(target, connector, query_interval)
        } else {
            BackendPool::new(target, connector, query_interval)
        };

        Self {
            config,
            config_path: None,
            pool: Arc::new(pool),
        }
    }

    /// Re-read addresses from `path` on every refresh
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn pool(&self) -> Arc<BackendPool<TcpConnector>> {
        Arc::clone(&self.pool)
    }

    pub fn refresh_interval(&self) -> Duration {
        self.config.backends.refresh_interval()
    }

    /// Load the current address list and reconcile the pool against it
    pub async fn refresh(&self) -> PoolResult<ReconcileSummary> {
        let addresses = match &self.config_path {
            Some(path) => {
                let latest = Config::load_from_file(path)?;
                if latest.balancer.target != self.config.balancer.target {
                    warn!(
                        service = %self.config.balancer.target,
                        configured = %latest.balancer.target,
                        path = ?path,
                        "Ignoring target change; restart to switch targets"
                    );
                }
                latest.backends.addresses
            }
            None => self.config.backends.addresses.clone(),
        };

        self.pool.update(addresses).await
    }

    /// Current server list
    pub async fn servers(&self) -> Vec<ServerDescriptor> {
        self.pool.snapshot().await
    }

    /// Refresh on a fixed interval until `shutdown` resolves, then close every
    /// backend. Refresh failures are logged and retried on the next tick.
    pub async fn run<F>(&self, shutdown: F) -> PoolResult<ReconcileSummary>
    where
        F: Future<Output = ()>,
    {
        info!(
            service = %self.pool.target(),
            interval = %format_duration(self.refresh_interval()),
            "Refreshing backends"
        );

        let mut ticker = self.refresh_ticker();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    match self.refresh().await {
                        Ok(summary) if summary.is_noop() => {}
                        Ok(summary) => {
                            let live = self.pool.len().await;
                            info!(
                                service = %self.pool.target(),
                                added = ?summary.added,
                                removed = ?summary.removed,
                                live,
                                "Backends updated"
                            );
                        }
                        Err(e) => log_refresh_error(self.pool.target(), &e),
                    }
                }
            }
        }

        self.pool.shutdown().await
    }

    /// Refresh ticker; a slow refresh pushes the next tick back instead of
    /// triggering catch-up refreshes
    fn refresh_ticker(&self) -> Interval {
        let mut ticker = tokio::time::interval(self.refresh_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    }
}

fn log_refresh_error(target: &str, e: &PoolError) {
    let severity = e.severity();
    match severity {
        ErrorSeverity::Critical | ErrorSeverity::Error => {
            error!(service = %target, %severity, error = %e, "Backend refresh failed")
        }
        ErrorSeverity::Warning => {
            warn!(service = %target, %severity, error = %e, "Backend refresh incomplete")
        }
        ErrorSeverity::Info => info!(service = %target, error = %e, "Backend refresh"),
    }
}
