use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::errors::GatewayResult;

/// Cache service trait for dependency injection
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Get a value from cache as raw bytes
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>>;

    /// Set a value in cache with TTL
    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GatewayResult<()>;

    /// Delete a value from cache
    async fn delete(&self, key: &str) -> GatewayResult<bool>;

    /// Health check for cache service
    async fn health_check(&self) -> GatewayResult<bool>;
}

/// JSON (de)serializing helpers over any [`CacheService`]
#[async_trait]
pub trait CacheServiceExt: Send + Sync {
    async fn get_typed<T>(&self, key: &str) -> GatewayResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync;

    async fn set_typed<T>(&self, key: &str, value: &T, ttl: Duration) -> GatewayResult<()>
    where
        T: Serialize + Send + Sync;
}

#[async_trait]
impl<C: CacheService + ?Sized> CacheServiceExt for C {
    async fn get_typed<T>(&self, key: &str) -> GatewayResult<Option<T>>
    where
        T: DeserializeOwned + Send + Sync,
    {
        match self.get(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn set_typed<T>(&self, key: &str, value: &T, ttl: Duration) -> GatewayResult<()>
    where
        T: Serialize + Send + Sync,
    {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes, ttl).await
    }
}
