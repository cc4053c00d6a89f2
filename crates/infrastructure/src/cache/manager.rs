use std::time::Duration;

use async_trait::async_trait;
use gateway_core::config::CacheConfig;
use gateway_core::{CacheService, GatewayError, GatewayResult};
use redis::aio::ConnectionManager;
use tracing::{debug, error, info, instrument};

/// Redis cache manager over a shared, auto-reconnecting connection
pub struct RedisCacheManager {
    connection: ConnectionManager,
    key_prefix: String,
}

fn cache_error(operation: &str, key: &str, e: redis::RedisError) -> GatewayError {
    error!("Cache {} failed for key {}: {}", operation, key, e);
    GatewayError::Cache(e.to_string())
}

impl RedisCacheManager {
    pub async fn new(config: &CacheConfig) -> GatewayResult<Self> {
        if !config.enabled {
            return Err(GatewayError::Configuration("Cache is disabled".to_string()));
        }

        info!("Creating Redis cache manager with URL: {}", config.redis_url);

        let client = redis::Client::open(config.redis_url.as_str())
            .map_err(|e| GatewayError::Cache(e.to_string()))?;

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let connection = tokio::time::timeout(timeout, client.get_connection_manager())
            .await
            .map_err(|_| GatewayError::Cache(format!("Redis connection timed out after {timeout:?}")))?
            .map_err(|e| GatewayError::Cache(e.to_string()))?;

        let manager = Self {
            connection,
            key_prefix: config.key_prefix.clone(),
        };
        manager.health_check().await?;

        info!("Redis cache manager created successfully");
        Ok(manager)
    }

    /// Build full cache key with prefix
    fn build_key(&self, key: &str) -> String {
        prefixed_key(&self.key_prefix, key)
    }
}

fn prefixed_key(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}:{key}")
    }
}

#[async_trait]
impl CacheService for RedisCacheManager {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        let result: Option<Vec<u8>> = redis::cmd("GET")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("GET", &full_key, e))?;

        debug!(hit = result.is_some(), "Cache GET: {}", full_key);
        Ok(result)
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GatewayResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        // SETEX rejects a zero expiry
        let ttl_seconds = ttl.as_secs().max(1);
        let _: () = redis::cmd("SETEX")
            .arg(&full_key)
            .arg(ttl_seconds)
            .arg(value)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("SET", &full_key, e))?;

        debug!("Cache SET: {} with TTL: {:?}", full_key, ttl);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, key: &str) -> GatewayResult<bool> {
        let full_key = self.build_key(key);
        let mut conn = self.connection.clone();

        let removed: i64 = redis::cmd("DEL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| cache_error("DELETE", &full_key, e))?;

        Ok(removed > 0)
    }

    async fn health_check(&self) -> GatewayResult<bool> {
        let mut conn = self.connection.clone();
        let pong: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| GatewayError::Cache(e.to_string()))?;
        Ok(pong == "PONG")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_prefixing() {
        assert_eq!(prefixed_key("gateway", "idempotency:req-1"), "gateway:idempotency:req-1");
        assert_eq!(prefixed_key("", "idempotency:req-1"), "idempotency:req-1");
    }

    #[tokio::test]
    async fn test_disabled_cache_is_a_configuration_error() {
        let config = CacheConfig {
            enabled: false,
            ..Default::default()
        };
        let err = RedisCacheManager::new(&config).await.err().unwrap();
        assert!(matches!(err, GatewayError::Configuration(_)));
    }
}
