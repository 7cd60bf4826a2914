use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;

use crate::chain::ChainConfig;
use crate::store::StoreConfig;

/// Configuration for the reputation ledger service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Chain gateway configuration
    pub chain: ChainConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection string
    pub postgres_url: String,
    /// Enable PostgreSQL (if false, uses in-memory fallback)
    pub postgres_enabled: bool,
    /// Connection pool size
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug)
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            postgres_url: "postgresql://localhost:5432/repledger".to_string(),
            postgres_enabled: false,
            max_connections: 10,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8090,
            },
            database: DatabaseConfig::default(),
            chain: ChainConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(host) = env::var("REPLEDGER_HOST") {
            config.server.host = host;
        }

        if let Ok(port) = env::var("REPLEDGER_PORT") {
            config.server.port = port.parse().context("Invalid REPLEDGER_PORT value")?;
        }

        if let Ok(url) = env::var("REPLEDGER_POSTGRES_URL") {
            config.database.postgres_url = url;
        }

        if let Ok(enabled) = env::var("REPLEDGER_POSTGRES_ENABLED") {
            config.database.postgres_enabled = enabled
                .parse()
                .context("Invalid REPLEDGER_POSTGRES_ENABLED value")?;
        }

        if let Ok(max) = env::var("REPLEDGER_POSTGRES_MAX_CONNECTIONS") {
            config.database.max_connections = max
                .parse()
                .context("Invalid REPLEDGER_POSTGRES_MAX_CONNECTIONS value")?;
        }

        if let Ok(url) = env::var("REPLEDGER_CHAIN_GATEWAY_URL") {
            config.chain.gateway_url = url;
        }

        if let Ok(key) = env::var("REPLEDGER_CHAIN_API_KEY") {
            config.chain.api_key = key;
        }

        if let Ok(enabled) = env::var("REPLEDGER_CHAIN_ENABLED") {
            config.chain.enabled = enabled
                .parse()
                .context("Invalid REPLEDGER_CHAIN_ENABLED value")?;
        }

        if let Ok(timeout) = env::var("REPLEDGER_CHAIN_TIMEOUT_SECS") {
            config.chain.timeout_secs = timeout
                .parse()
                .context("Invalid REPLEDGER_CHAIN_TIMEOUT_SECS value")?;
        }

        if let Ok(retries) = env::var("REPLEDGER_CHAIN_MAX_RETRIES") {
            config.chain.max_retries = retries
                .parse()
                .context("Invalid REPLEDGER_CHAIN_MAX_RETRIES value")?;
        }

        if let Ok(level) = env::var("REPLEDGER_LOG_LEVEL") {
            config.logging.level = level;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for consistency
    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(anyhow::anyhow!("Server host cannot be empty"));
        }

        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port must be non-zero"));
        }

        if self.database.postgres_enabled && self.database.postgres_url.is_empty() {
            return Err(anyhow::anyhow!(
                "PostgreSQL is enabled but no connection URL is configured"
            ));
        }

        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("Connection pool size must be non-zero"));
        }

        if self.chain.enabled && self.chain.gateway_url.is_empty() {
            return Err(anyhow::anyhow!(
                "Chain gateway is enabled but no gateway URL is configured"
            ));
        }

        Ok(())
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            database_url: self
                .database
                .postgres_enabled
                .then(|| self.database.postgres_url.clone()),
            max_connections: self.database.max_connections,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ServiceConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_enabled_chain_requires_gateway_url() {
        let mut config = ServiceConfig::default();
        config.chain.enabled = true;
        config.chain.gateway_url = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_store_config_disabled_database() {
        let config = ServiceConfig::default();
        assert!(config.store_config().database_url.is_none());
    }
}
