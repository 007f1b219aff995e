//! API configuration

use serde::Deserialize;

use domain_sync::SyncConfig;
use infra_db::DatabaseConfig;

/// API configuration
///
/// Loaded from defaults overlaid with `API_`-prefixed environment
/// variables; nested keys use `__`, e.g. `API_SYNC__BASE_CURRENCY=USD`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Database URL
    pub database_url: String,
    /// Maximum pooled database connections
    pub database_max_connections: u32,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    /// Synchronization settings
    pub sync: SyncConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: "postgres://localhost/farm".to_string(),
            database_max_connections: 10,
            log_level: "info".to_string(),
            sync: SyncConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Pool settings for the configured database
    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig::new(&self.database_url).max_connections(self.database_max_connections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.sync.base_currency, Currency::BRL);
        assert_eq!(config.database().max_connections, 10);
    }

    #[test]
    fn test_partial_source_keeps_defaults() {
        let config: ApiConfig = config::Config::builder()
            .set_override("port", 9090)
            .unwrap()
            .set_override("sync.revenue_category", "Vendas")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.sync.revenue_category, "Vendas");
        assert_eq!(config.sync.description_prefix, "Sales order");
    }
}
