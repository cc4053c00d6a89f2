//! 内存实现
//!
//! 嵌入式模式和测试使用的存储、缓存和消息发布实现，语义与 PostgreSQL、Redis、
//! RabbitMQ 实现保持一致：重复键返回 `Conflict`，缓存条目按 TTL 过期，
//! 没有绑定队列的路由键会被拒绝。

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use gateway_core::config::MessageQueueConfig;
use gateway_core::{
    CacheService, GatewayError, GatewayResult, IdempotencyEntry, IdempotencyRepository,
    MessagePublisher, NewNotification, NotificationRecord, NotificationRepository,
    NotificationStatus,
};
use parking_lot::RwLock;
use tracing::debug;
use uuid::Uuid;

/// 内存通知存储，按插入顺序保存
#[derive(Debug, Default)]
pub struct InMemoryNotificationRepository {
    records: RwLock<Vec<NotificationRecord>>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// 当前所有记录的快照
    pub fn records(&self) -> Vec<NotificationRecord> {
        self.records.read().clone()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> GatewayResult<NotificationRecord> {
        let mut records = self.records.write();
        if records
            .iter()
            .any(|r| r.request_id == notification.request_id)
        {
            return Err(GatewayError::Conflict(format!(
                "notification {} already exists",
                notification.request_id
            )));
        }

        let record = notification.clone().into_record(Uuid::new_v4(), Utc::now());
        records.push(record.clone());
        debug!(request_id = %record.request_id, "内存通知记录已创建");
        Ok(record)
    }

    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> GatewayResult<()> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| GatewayError::notification_not_found(id.to_string()))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(())
    }

    async fn update_status_by_request_id(
        &self,
        request_id: &str,
        status: NotificationStatus,
    ) -> GatewayResult<NotificationRecord> {
        let mut records = self.records.write();
        let record = records
            .iter_mut()
            .find(|r| r.request_id == request_id)
            .ok_or_else(|| GatewayError::notification_not_found(request_id))?;
        record.status = status;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn get_by_request_id(
        &self,
        request_id: &str,
    ) -> GatewayResult<Option<NotificationRecord>> {
        Ok(self
            .records
            .read()
            .iter()
            .find(|r| r.request_id == request_id)
            .cloned())
    }

    async fn list(&self, page: u32, limit: u32) -> GatewayResult<(Vec<NotificationRecord>, u64)> {
        let records = self.records.read();
        let offset = page.saturating_sub(1) as usize * limit as usize;
        let items = records
            .iter()
            .rev()
            .skip(offset)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((items, records.len() as u64))
    }
}

/// 内存幂等记录存储，只写一次
#[derive(Debug, Default)]
pub struct InMemoryIdempotencyRepository {
    entries: RwLock<HashMap<String, IdempotencyEntry>>,
}

impl InMemoryIdempotencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl IdempotencyRepository for InMemoryIdempotencyRepository {
    async fn get_entry(&self, key: &str) -> GatewayResult<Option<IdempotencyEntry>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn put_entry(&self, entry: &IdempotencyEntry) -> GatewayResult<()> {
        let mut entries = self.entries.write();
        if entries.contains_key(&entry.key) {
            return Err(GatewayError::Conflict(format!(
                "idempotency key {} already exists",
                entry.key
            )));
        }
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}

/// 带过期时间的内存缓存
#[derive(Debug, Default)]
pub struct InMemoryCache {
    entries: RwLock<HashMap<String, (Vec<u8>, Instant)>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 未过期的条目数
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheService for InMemoryCache {
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        let now = Instant::now();
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > now => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }
        // 惰性清理过期条目
        self.entries.write().remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GatewayResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), (value.to_vec(), Instant::now() + ttl));
        Ok(())
    }

    async fn delete(&self, key: &str) -> GatewayResult<bool> {
        Ok(self.entries.write().remove(key).is_some())
    }

    async fn health_check(&self) -> GatewayResult<bool> {
        Ok(true)
    }
}

/// 内存消息发布端，按路由键保存已发布的消息
#[derive(Debug)]
pub struct InMemoryPublisher {
    routing_keys: HashSet<String>,
    published: RwLock<HashMap<String, Vec<Vec<u8>>>>,
    connected: AtomicBool,
}

impl InMemoryPublisher {
    pub fn new<I, S>(routing_keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            routing_keys: routing_keys.into_iter().map(Into::into).collect(),
            published: RwLock::new(HashMap::new()),
            connected: AtomicBool::new(true),
        }
    }

    /// 使用配置中绑定了路由键的队列
    pub fn from_config(config: &MessageQueueConfig) -> Self {
        Self::new(config.routing_keys())
    }

    /// 某个路由键上已发布的消息
    pub fn published(&self, routing_key: &str) -> Vec<Vec<u8>> {
        self.published
            .read()
            .get(routing_key)
            .cloned()
            .unwrap_or_default()
    }

    pub fn published_count(&self) -> usize {
        self.published.read().values().map(Vec::len).sum()
    }
}

#[async_trait]
impl MessagePublisher for InMemoryPublisher {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> GatewayResult<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(GatewayError::BrokerConnection(
                "in-memory publisher is closed".to_string(),
            ));
        }
        if !self.routing_keys.contains(routing_key) {
            return Err(GatewayError::MessageQueue(format!(
                "no queue bound to routing key {routing_key}"
            )));
        }

        self.published
            .write()
            .entry(routing_key.to_string())
            .or_default()
            .push(payload.to_vec());
        Ok(())
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn reconnect(&self) -> GatewayResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) -> GatewayResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
