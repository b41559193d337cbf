//! Server configuration module
//! Handles runtime configuration parameters for the relay server

use crate::constants::{
    DEFAULT_CLIENT_TIMEOUT_SECS, DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SWEEP_INTERVAL_SECS,
};
use crate::error::{RelayError, Result};
use std::env;
use std::time::Duration;

/// Server configuration parameters
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Period of the liveness sweep
    pub sweep_interval: Duration,
    /// Clients without a position update for longer than this are evicted
    pub client_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            client_timeout: Duration::from_secs(DEFAULT_CLIENT_TIMEOUT_SECS),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables if available
    pub fn from_env() -> Result<Self> {
        let host = env::var("RELAY_HOST").unwrap_or(DEFAULT_HOST.to_string());

        // PORT is what hosting platforms inject; RELAY_PORT wins when both are set
        let port = match env::var("RELAY_PORT").or_else(|_| env::var("PORT")) {
            Ok(raw) => raw.parse().map_err(|_| {
                RelayError::ConfigError(format!("Invalid port value: {}", raw))
            })?,
            Err(_) => DEFAULT_PORT,
        };

        let sweep_secs = Self::read_secs("RELAY_SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?;
        let timeout_secs = Self::read_secs("RELAY_CLIENT_TIMEOUT_SECS", DEFAULT_CLIENT_TIMEOUT_SECS)?;

        let config = Self {
            host,
            port,
            sweep_interval: Duration::from_secs(sweep_secs),
            client_timeout: Duration::from_secs(timeout_secs),
        };
        config.validate()?;

        Ok(config)
    }

    fn read_secs(key: &str, default: u64) -> Result<u64> {
        match env::var(key) {
            Ok(raw) => raw.parse().map_err(|_| {
                RelayError::ConfigError(format!("{} must be a whole number of seconds, got '{}'", key, raw))
            }),
            Err(_) => Ok(default),
        }
    }

    /// Check that the sweep timing is usable
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(RelayError::ConfigError(
                "Sweep interval must be greater than zero".to_string(),
            ));
        }

        if self.client_timeout < self.sweep_interval {
            return Err(RelayError::ConfigError(format!(
                "Client timeout ({}s) must not be shorter than the sweep interval ({}s)",
                self.client_timeout.as_secs(),
                self.sweep_interval.as_secs()
            )));
        }

        Ok(())
    }

    /// Socket address string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_reference_timing() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 3000);
        assert_eq!(config.sweep_interval, Duration::from_secs(10));
        assert_eq!(config.client_timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = ServerConfig {
            sweep_interval: Duration::ZERO,
            ..ServerConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Sweep interval"));
    }

    #[test]
    fn test_timeout_shorter_than_interval_rejected() {
        let config = ServerConfig {
            sweep_interval: Duration::from_secs(10),
            client_timeout: Duration::from_secs(5),
            ..ServerConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bind_address() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 4000,
            ..ServerConfig::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:4000");
    }
}
