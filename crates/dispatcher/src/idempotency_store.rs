use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, error, warn};

use gateway_core::{
    CacheService, CacheServiceExt, GatewayResult, IdempotencyEntry, IdempotencyRepository,
};

/// 缓存中幂等记录的默认过期时间（24小时）
pub const DEFAULT_IDEMPOTENCY_TTL: Duration = Duration::from_secs(86_400);

/// 幂等记录的缓存键
pub fn cache_key(request_id: &str) -> String {
    format!("idempotency:{request_id}")
}

/// 幂等存储：快速缓存 + 持久化存储
///
/// 查询失败一律降级为“不存在”，幂等检查不会阻塞请求处理。写入先落持久化
/// 存储，再尽力回填缓存。
pub struct IdempotencyStore {
    repository: Arc<dyn IdempotencyRepository>,
    cache: Option<Arc<dyn CacheService>>,
    ttl: Duration,
}

impl IdempotencyStore {
    pub fn new(
        repository: Arc<dyn IdempotencyRepository>,
        cache: Option<Arc<dyn CacheService>>,
        ttl: Duration,
    ) -> Self {
        Self {
            repository,
            cache,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// 缓存健康状态，未配置缓存时为 `None`
    pub async fn cache_healthy(&self) -> Option<bool> {
        let cache = self.cache.as_ref()?;
        Some(matches!(cache.health_check().await, Ok(true)))
    }

    /// 查询请求ID对应的已存响应
    pub async fn lookup(&self, request_id: &str) -> Option<Value> {
        let key = cache_key(request_id);

        if let Some(cache) = &self.cache {
            match cache.get_typed::<Value>(&key).await {
                Ok(Some(response)) => {
                    debug!(request_id, "幂等缓存命中");
                    return Some(response);
                }
                Ok(None) => {}
                Err(e) => warn!(request_id, error = %e, "读取幂等缓存失败，回退到持久化存储"),
            }
        }

        let entry = match self.repository.get_entry(request_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                error!(request_id, error = %e, "查询幂等记录失败");
                return None;
            }
        };

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_typed(&key, &entry.response, self.ttl).await {
                warn!(request_id, error = %e, "回填幂等缓存失败");
            }
        }

        Some(entry.response)
    }

    /// 保存请求ID对应的响应（只写一次）
    ///
    /// 持久化写入失败（包括重复键的 `Conflict`）会返回给调用方。
    pub async fn store(&self, request_id: &str, response: &Value) -> GatewayResult<()> {
        let entry = IdempotencyEntry::new(request_id, response.clone());
        if let Err(e) = self.repository.put_entry(&entry).await {
            error!(request_id, error = %e, "保存幂等记录失败");
            return Err(e);
        }

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.set_typed(&cache_key(request_id), response, self.ttl).await {
                warn!(request_id, error = %e, "写入幂等缓存失败");
            }
        }

        Ok(())
    }
}
