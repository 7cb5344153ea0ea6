/// Unified error handling for grpclb-backends
///
/// Errors are split by who raises them: the transport collaborator reports
/// `BackendError` for a single address, the pool aggregates those into a
/// `PoolError` for a whole reconciliation.

use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

use crate::config::ConfigError;

/// Errors raised by a backend connection for one address
#[derive(Debug, Error)]
pub enum BackendError {
    /// Dialing the address failed
    #[error("failed to connect to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Dialing did not complete within the connect timeout
    #[error("connecting to {address} timed out after {timeout:?}")]
    Timeout { address: String, timeout: Duration },

    /// Host name resolved to no socket addresses
    #[error("address {address} did not resolve to any socket address")]
    Resolve { address: String },

    /// Address string is not usable as `host:port`
    #[error("invalid address {address}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// Handle was already closed
    #[error("backend {address} is already closed")]
    Closed { address: String },

    /// Anything else a transport wants to report
    #[error("backend error: {message}")]
    Other { message: String },
}

/// A single failed connection attempt within a reconciliation
#[derive(Debug)]
pub struct ConnectFailure {
    pub address: String,
    pub error: BackendError,
}

impl fmt::Display for ConnectFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.address, self.error)
    }
}

/// Errors surfaced by the backend pool
#[derive(Debug, Error)]
pub enum PoolError {
    /// One or more added addresses could not be connected.
    /// Addresses that did connect in the same call remain in the pool.
    #[error("target {target}: {} of the added backends failed to connect ({})", .failures.len(), join_failures(.failures))]
    Connect {
        target: String,
        failures: Vec<ConnectFailure>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

fn join_failures(failures: &[ConnectFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias for pool operations
pub type PoolResult<T> = Result<T, PoolError>;

/// Convenience methods for creating backend errors
impl BackendError {
    pub fn invalid_address<S: Into<String>>(address: S, reason: S) -> Self {
        BackendError::InvalidAddress {
            address: address.into(),
            reason: reason.into(),
        }
    }

    pub fn other<S: Into<String>>(message: S) -> Self {
        BackendError::Other {
            message: message.into(),
        }
    }

    /// Check if a later reconciliation may succeed for the same address
    pub fn is_recoverable(&self) -> bool {
        match self {
            BackendError::Connect { .. } => true,
            BackendError::Timeout { .. } => true,
            BackendError::Resolve { .. } => true,
            BackendError::Other { .. } => true,
            BackendError::InvalidAddress { .. } => false,
            BackendError::Closed { .. } => false,
        }
    }
}

impl PoolError {
    /// Addresses that failed to connect, in sorted order
    pub fn failed_addresses(&self) -> Vec<&str> {
        match self {
            PoolError::Connect { failures, .. } => {
                failures.iter().map(|f| f.address.as_str()).collect()
            }
            PoolError::Config(_) => Vec::new(),
        }
    }

    /// Check if this error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            PoolError::Connect { failures, .. } => {
                failures.iter().any(|f| f.error.is_recoverable())
            }
            PoolError::Config(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PoolError::Config(_) => ErrorSeverity::Critical,
            PoolError::Connect { .. } => ErrorSeverity::Warning,
        }
    }
}

/// Error severity levels for logging and monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical errors that require immediate attention
    Critical,
    /// Errors that affect functionality but don't crash the system
    Error,
    /// Warnings about potential issues
    Warning,
    /// Informational messages about recoverable issues
    Info,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Warning => write!(f, "WARNING"),
            ErrorSeverity::Info => write!(f, "INFO"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect_failure(address: &str) -> ConnectFailure {
        ConnectFailure {
            address: address.to_string(),
            error: BackendError::Connect {
                address: address.to_string(),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "refused"),
            },
        }
    }

    #[test]
    fn test_backend_error_display() {
        let error = BackendError::invalid_address("nohost", "missing port");
        assert_eq!(error.to_string(), "invalid address nohost: missing port");

        let error = BackendError::Timeout {
            address: "a:1".to_string(),
            timeout: Duration::from_millis(250),
        };
        assert_eq!(error.to_string(), "connecting to a:1 timed out after 250ms");
    }

    #[test]
    fn test_pool_error_lists_failures() {
        let error = PoolError::Connect {
            target: "svc".to_string(),
            failures: vec![connect_failure("a:1"), connect_failure("a:3")],
        };

        assert_eq!(error.failed_addresses(), vec!["a:1", "a:3"]);
        let message = error.to_string();
        assert!(message.starts_with("target svc: 2 of the added backends failed to connect"));
        assert!(message.contains("a:1: failed to connect to a:1: refused"));
        assert!(message.contains("a:3"));
    }

    #[test]
    fn test_error_severity() {
        let config_error = PoolError::Config(ConfigError::ValidationError("test".to_string()));
        assert_eq!(config_error.severity(), ErrorSeverity::Critical);
        assert_eq!(config_error.severity().to_string(), "CRITICAL");

        let connect_error = PoolError::Connect {
            target: "svc".to_string(),
            failures: vec![connect_failure("a:1")],
        };
        assert_eq!(connect_error.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_error_recoverability() {
        let connect_error = PoolError::Connect {
            target: "svc".to_string(),
            failures: vec![connect_failure("a:1")],
        };
        assert!(connect_error.is_recoverable());

        let invalid = PoolError::Connect {
            target: "svc".to_string(),
            failures: vec![ConnectFailure {
                address: "bogus".to_string(),
                error: BackendError::invalid_address("bogus", "missing port"),
            }],
        };
        assert!(!invalid.is_recoverable());

        let config_error = PoolError::Config(ConfigError::ValidationError("test".to_string()));
        assert!(!config_error.is_recoverable());
        assert!(config_error.failed_addresses().is_empty());
    }
}
