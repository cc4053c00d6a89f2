use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{GatewayError, GatewayResult};

/// Redis cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub redis_url: String,
    /// Prepended to every key as `{prefix}:`
    pub key_prefix: String,
    pub idempotency_ttl_seconds: u64,
    pub connection_timeout_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: "redis://127.0.0.1:6379/0".to_string(),
            key_prefix: "gateway".to_string(),
            idempotency_ttl_seconds: 86_400,
            connection_timeout_seconds: 5,
        }
    }
}

impl CacheConfig {
    pub fn idempotency_ttl(&self) -> Duration {
        Duration::from_secs(self.idempotency_ttl_seconds)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if !self.enabled {
            return Ok(());
        }

        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(GatewayError::Configuration(format!(
                "cache url must be a Redis url: {}",
                self.redis_url
            )));
        }

        if self.idempotency_ttl_seconds == 0 {
            return Err(GatewayError::Configuration(
                "idempotency_ttl_seconds must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
