use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{
    api_observability::{ApiConfig, ObservabilityConfig},
    cache::CacheConfig,
    database::DatabaseConfig,
    message_queue::MessageQueueConfig,
    resilience::ResilienceConfig,
};
use crate::errors::GatewayResult;

/// Default config file locations, tried in order when no path is given
const DEFAULT_CONFIG_PATHS: [&str; 3] = [
    "config/gateway.toml",
    "gateway.toml",
    "/etc/notification-gateway/config.toml",
];

/// Gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub message_queue: MessageQueueConfig,
    pub cache: CacheConfig,
    pub resilience: ResilienceConfig,
    pub api: ApiConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load configuration from config file and environment variables
    ///
    /// Load order:
    /// 1. Built-in defaults
    /// 2. Config file (TOML format)
    /// 3. Environment variable overrides (`GATEWAY_SECTION__KEY`)
    ///
    /// An explicit `config_path` must exist. Without one, the default
    /// locations are tried and built-in defaults are used if none exists.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        match config_path {
            Some(path) => {
                if !Path::new(path).exists() {
                    return Err(anyhow::anyhow!("Config file does not exist: {path}"));
                }
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
            None => {
                if let Some(path) = DEFAULT_CONFIG_PATHS
                    .iter()
                    .find(|path| Path::new(path).exists())
                {
                    builder = builder.add_source(File::new(path, FileFormat::Toml));
                }
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate().context("Invalid configuration")?;

        Ok(config)
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("Failed to parse TOML config")?;

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config to TOML")
    }

    pub fn validate(&self) -> GatewayResult<()> {
        self.database.validate()?;
        self.message_queue.validate()?;
        self.cache.validate()?;
        self.resilience.validate()?;
        self.api.validate()?;
        self.observability.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use crate::logging::LogFormat;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.idempotency_ttl_seconds, 86_400);
        assert_eq!(config.message_queue.exchange, "notifications.direct");
    }

    #[test]
    fn test_from_toml_partial_overrides() {
        let toml_str = r#"
            [database]
            url = "postgres://gateway:secret@db/notifications"
            max_connections = 20

            [resilience.broker_circuit_breaker]
            failure_threshold = 5
            recovery_timeout_ms = 1000
            counted_errors = ["connection", "message_queue"]

            [observability]
            log_format = "json"
        "#;

        let config = AppConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.database.min_connections, 1);
        assert_eq!(config.resilience.broker_circuit_breaker.failure_threshold, 5);
        assert_eq!(
            config.resilience.broker_circuit_breaker.counted_errors,
            Some(vec![ErrorKind::Connection, ErrorKind::MessageQueue])
        );
        assert_eq!(config.resilience.database_circuit_breaker.failure_threshold, 2);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_from_toml_rejects_invalid_values() {
        let toml_str = r#"
            [resilience.database_circuit_breaker]
            failure_threshold = 0
            recovery_timeout_ms = 1000
        "#;
        assert!(AppConfig::from_toml(toml_str).is_err());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let serialized = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&serialized).unwrap();
        assert_eq!(parsed.api.bind_address, config.api.bind_address);
        assert_eq!(parsed.message_queue.queues, config.message_queue.queues);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
            [api]
            bind_address = "127.0.0.1:9090"

            [cache]
            enabled = false
            "#
        )
        .unwrap();

        let config = AppConfig::load(file.path().to_str()).unwrap();
        assert_eq!(config.api.bind_address, "127.0.0.1:9090");
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_sample_config_matches_defaults() {
        let sample = include_str!("../../../../../config/gateway.toml");
        let config = AppConfig::from_toml(sample).unwrap();
        assert_eq!(config.message_queue.queues, MessageQueueConfig::default().queues);
        assert_eq!(
            config.resilience.broker_circuit_breaker,
            ResilienceConfig::default().broker_circuit_breaker
        );
        assert_eq!(config.api.rate_limit, ApiConfig::default().rate_limit);
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        assert!(AppConfig::load(Some("/nonexistent/gateway.toml")).is_err());
    }
}
