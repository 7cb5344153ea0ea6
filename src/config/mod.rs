/// Configuration management for grpclb-backends

use crate::utils::split_host_port;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Balancer target configuration
    pub balancer: BalancerConfig,
    /// Backend address source
    pub backends: BackendsConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Balancer target configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerConfig {
    /// Logical service target the pool serves
    pub target: String,
    /// Query interval handed to every backend, in milliseconds
    pub query_interval_ms: u64,
    /// Run overlapping reconciliations one at a time
    #[serde(default)]
    pub serialize_reconcile: bool,
}

/// Backend address source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendsConfig {
    /// Candidate backend addresses (`host:port`)
    pub addresses: Vec<String>,
    /// How often the address list is re-read, in seconds
    pub refresh_interval_sec: u64,
    /// Connect timeout for each backend, in milliseconds
    pub connect_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,
    /// Log format (json, text)
    pub format: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            balancer: BalancerConfig {
                target: "localhost:8080".to_string(),
                query_interval_ms: 5000,
                serialize_reconcile: false,
            },
            backends: BackendsConfig {
                addresses: vec!["127.0.0.1:8080".to_string()],
                refresh_interval_sec: 30,
                connect_timeout_ms: 3000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
            },
        }
    }
}

impl BalancerConfig {
    pub fn query_interval(&self) -> Duration {
        Duration::from_millis(self.query_interval_ms)
    }
}

impl BackendsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_sec)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        fs::write(path, content)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.balancer.target.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "balancer target cannot be empty".to_string(),
            ));
        }

        if self.balancer.query_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "query_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.backends.refresh_interval_sec == 0 {
            return Err(ConfigError::ValidationError(
                "refresh_interval_sec must be greater than 0".to_string(),
            ));
        }

        if self.backends.connect_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than 0".to_string(),
            ));
        }

        // An empty address list is valid: it drains the pool
        for addr in &self.backends.addresses {
            split_host_port(addr).map_err(|reason| {
                ConfigError::ValidationError(format!("Invalid backend address '{}': {}", addr, reason))
            })?;
        }

        match self.logging.level.as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log level: {}", self.logging.level)
            )),
        }

        match self.logging.format.as_str() {
            "json" | "text" => {}
            _ => return Err(ConfigError::ValidationError(
                format!("Invalid log format: {}", self.logging.format)
            )),
        }

        Ok(())
    }

    /// Create example configuration file
    pub fn create_example_config<P: AsRef<Path>>(path: P) -> Result<(), ConfigError> {
        let config = Config {
            balancer: BalancerConfig {
                target: "users.svc:8080".to_string(),
                query_interval_ms: 5000,
                serialize_reconcile: false,
            },
            backends: BackendsConfig {
                addresses: vec![
                    "10.0.1.10:8080".to_string(),
                    "10.0.1.11:8080".to_string(),
                    "10.0.1.12:8080".to_string(),
                ],
                refresh_interval_sec: 30,
                connect_timeout_ms: 3000,
            },
            ..Default::default()
        };

        config.save_to_file(path)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.balancer.query_interval(), Duration::from_secs(5));
        assert_eq!(config.backends.connect_timeout(), Duration::from_secs(3));
        assert_eq!(config.backends.refresh_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.balancer.query_interval_ms = 0;
        assert!(config.validate().is_err());
        config.balancer.query_interval_ms = 1000;
        assert!(config.validate().is_ok());

        config.balancer.target = "  ".to_string();
        assert!(config.validate().is_err());
        config.balancer.target = "svc".to_string();

        config.backends.addresses = vec!["10.0.0.1".to_string()];
        let err = config.validate().unwrap_err();
        assert_eq!(
            err.to_string(),
            "Validation error: Invalid backend address '10.0.0.1': missing port"
        );

        config.backends.addresses = Vec::new();
        assert!(config.validate().is_ok());

        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_serialize_reconcile_defaults_off() {
        let toml_str = r#"
            [balancer]
            target = "svc"
            query_interval_ms = 100

            [backends]
            addresses = ["a:1", "a:2"]
            refresh_interval_sec = 5
            connect_timeout_ms = 500

            [logging]
            level = "debug"
            format = "json"
        "#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.validate().is_ok());
        assert!(!config.balancer.serialize_reconcile);
        assert_eq!(config.backends.addresses, vec!["a:1", "a:2"]);
    }

    #[test]
    fn test_config_file_operations() {
        let temp_file = NamedTempFile::new().unwrap();

        Config::create_example_config(temp_file.path()).unwrap();
        let loaded_config = Config::load_from_file(temp_file.path()).unwrap();
        assert_eq!(loaded_config.balancer.target, "users.svc:8080");
        assert_eq!(loaded_config.backends.addresses.len(), 3);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load_from_file("/nonexistent/grpclb-backends.toml");
        assert!(matches!(result, Err(ConfigError::IoError(_))));
    }
}
