use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // HTTP server
    pub app_host: String,
    pub app_port: u16,

    // Search backend
    pub opensearch_host: String,
    pub opensearch_username: String,
    pub opensearch_password: String,
    pub clients_index: String,

    // Timeouts
    pub search_timeout_secs: u64,
    /// 0 disables the batch deadline.
    pub batch_timeout_secs: u64,

    /// Index catalog file; the built-in catalog is used when unset.
    #[serde(default)]
    pub index_catalog_path: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .set_default("app_host", "0.0.0.0")?
            .set_default("app_port", 8080)?
            .set_default("opensearch_host", "")?
            .set_default("opensearch_username", "")?
            .set_default("opensearch_password", "")?
            .set_default("clients_index", "clients-searcher")?
            .set_default("search_timeout_secs", 5)?
            .set_default("batch_timeout_secs", 120)?
            .add_source(config::Environment::default())
            .build()?;

        config.try_deserialize()
    }

    pub fn validate(&self) -> Result<()> {
        if self.app_port == 0 {
            return Err(anyhow!("APP_PORT must be greater than 0"));
        }

        if self.opensearch_host.is_empty() {
            return Err(anyhow!("OPENSEARCH_HOST is required"));
        }

        if self.opensearch_username.is_empty() {
            return Err(anyhow!("OPENSEARCH_USERNAME is required"));
        }

        if self.opensearch_password.is_empty() {
            return Err(anyhow!("OPENSEARCH_PASSWORD is required"));
        }

        if self.clients_index.is_empty() {
            return Err(anyhow!("CLIENTS_INDEX must not be empty"));
        }

        if !(1..=9).contains(&self.search_timeout_secs) {
            return Err(anyhow!("SEARCH_TIMEOUT_SECS must be between 1 and 9"));
        }

        Ok(())
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        (self.batch_timeout_secs > 0).then(|| Duration::from_secs(self.batch_timeout_secs))
    }
}
