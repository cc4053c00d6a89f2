//! Failure-injecting test doubles
//!
//! Each mock wraps the matching in-memory implementation from
//! `gateway-infrastructure` and can be told to fail the next N calls (or all
//! calls) of a given operation. Every call is counted, including failed ones.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use gateway_core::{
    CacheService, GatewayError, GatewayResult, IdempotencyEntry, IdempotencyRepository,
    MessagePublisher, NewNotification, NotificationRecord, NotificationRepository,
    NotificationStatus,
};
use gateway_infrastructure::{
    InMemoryCache, InMemoryIdempotencyRepository, InMemoryNotificationRepository,
    InMemoryPublisher,
};
use uuid::Uuid;

/// Remaining failures for one operation; `usize::MAX` means fail forever
#[derive(Debug, Default)]
struct FailureBudget(AtomicUsize);

impl FailureBudget {
    fn set(&self, n: usize) {
        self.0.store(n, Ordering::SeqCst);
    }

    /// Consume one failure if any remain
    fn take(&self) -> bool {
        self.0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| match left {
                0 => None,
                usize::MAX => Some(usize::MAX),
                n => Some(n - 1),
            })
            .is_ok()
    }
}

/// Notification store that can fail creates and status updates
#[derive(Debug, Default)]
pub struct MockNotificationRepository {
    inner: InMemoryNotificationRepository,
    create_failures: FailureBudget,
    update_failures: FailureBudget,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    unhealthy: AtomicBool,
}

impl MockNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_creates(&self, n: usize) {
        self.create_failures.set(n);
    }

    pub fn fail_all_creates(&self) {
        self.create_failures.set(usize::MAX);
    }

    pub fn fail_next_updates(&self, n: usize) {
        self.update_failures.set(n);
    }

    pub fn fail_all_updates(&self) {
        self.update_failures.set(usize::MAX);
    }

    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.unhealthy.store(unhealthy, Ordering::SeqCst);
    }

    /// Stop injecting failures
    pub fn heal(&self) {
        self.create_failures.set(0);
        self.update_failures.set(0);
        self.set_unhealthy(false);
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> Vec<NotificationRecord> {
        self.inner.records()
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }

    pub fn find(&self, request_id: &str) -> Option<NotificationRecord> {
        self.records()
            .into_iter()
            .find(|r| r.request_id == request_id)
    }
}

#[async_trait]
impl NotificationRepository for MockNotificationRepository {
    async fn create(&self, notification: &NewNotification) -> GatewayResult<NotificationRecord> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        if self.create_failures.take() {
            return Err(GatewayError::DatabaseOperation(
                "connection refused".to_string(),
            ));
        }
        self.inner.create(notification).await
    }

    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> GatewayResult<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.update_failures.take() {
            return Err(GatewayError::DatabaseOperation(
                "connection refused".to_string(),
            ));
        }
        self.inner.update_status(id, status).await
    }

    async fn update_status_by_request_id(
        &self,
        request_id: &str,
        status: NotificationStatus,
    ) -> GatewayResult<NotificationRecord> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.update_failures.take() {
            return Err(GatewayError::DatabaseOperation(
                "connection refused".to_string(),
            ));
        }
        self.inner
            .update_status_by_request_id(request_id, status)
            .await
    }

    async fn get_by_request_id(
        &self,
        request_id: &str,
    ) -> GatewayResult<Option<NotificationRecord>> {
        self.inner.get_by_request_id(request_id).await
    }

    async fn list(&self, page: u32, limit: u32) -> GatewayResult<(Vec<NotificationRecord>, u64)> {
        self.inner.list(page, limit).await
    }

    async fn health_check(&self) -> GatewayResult<()> {
        if self.unhealthy.load(Ordering::SeqCst) {
            return Err(GatewayError::DatabaseOperation(
                "connection refused".to_string(),
            ));
        }
        Ok(())
    }
}

/// Idempotency store whose reads or writes can be switched off
#[derive(Debug, Default)]
pub struct MockIdempotencyRepository {
    inner: InMemoryIdempotencyRepository,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
}

impl MockIdempotencyRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn count(&self) -> usize {
        self.inner.len()
    }
}

#[async_trait]
impl IdempotencyRepository for MockIdempotencyRepository {
    async fn get_entry(&self, key: &str) -> GatewayResult<Option<IdempotencyEntry>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(GatewayError::DatabaseOperation("read timed out".to_string()));
        }
        self.inner.get_entry(key).await
    }

    async fn put_entry(&self, entry: &IdempotencyEntry) -> GatewayResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(GatewayError::DatabaseOperation("write timed out".to_string()));
        }
        self.inner.put_entry(entry).await
    }
}

/// Cache that can be made unavailable
#[derive(Debug, Default)]
pub struct MockCache {
    inner: InMemoryCache,
    unavailable: AtomicBool,
    get_calls: AtomicUsize,
    set_calls: AtomicUsize,
}

impl MockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn set_calls(&self) -> usize {
        self.set_calls.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    fn check(&self) -> GatewayResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Cache("connection refused".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl CacheService for MockCache {
    async fn get(&self, key: &str) -> GatewayResult<Option<Vec<u8>>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: &[u8], ttl: Duration) -> GatewayResult<()> {
        self.set_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, key: &str) -> GatewayResult<bool> {
        self.check()?;
        self.inner.delete(key).await
    }

    async fn health_check(&self) -> GatewayResult<bool> {
        Ok(!self.unavailable.load(Ordering::SeqCst))
    }
}

/// Publisher that can drop the connection or have messages refused
#[derive(Debug)]
pub struct MockPublisher {
    inner: InMemoryPublisher,
    connection_failures: FailureBudget,
    refusals: FailureBudget,
    publish_calls: AtomicUsize,
}

impl MockPublisher {
    /// Accepts the `email` and `push` routing keys
    pub fn new() -> Self {
        Self {
            inner: InMemoryPublisher::new(["email", "push"]),
            connection_failures: FailureBudget::default(),
            refusals: FailureBudget::default(),
            publish_calls: AtomicUsize::new(0),
        }
    }

    /// Fail the next `n` publishes with `BrokerConnection`
    pub fn fail_next_publishes(&self, n: usize) {
        self.connection_failures.set(n);
    }

    pub fn fail_all_publishes(&self) {
        self.connection_failures.set(usize::MAX);
    }

    /// Refuse the next `n` publishes with `MessageQueue`
    pub fn refuse_next_publishes(&self, n: usize) {
        self.refusals.set(n);
    }

    pub fn heal(&self) {
        self.connection_failures.set(0);
        self.refusals.set(0);
    }

    pub fn publish_calls(&self) -> usize {
        self.publish_calls.load(Ordering::SeqCst)
    }

    pub fn published(&self, routing_key: &str) -> Vec<Vec<u8>> {
        self.inner.published(routing_key)
    }

    pub fn published_count(&self) -> usize {
        self.inner.published_count()
    }
}

impl Default for MockPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePublisher for MockPublisher {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> GatewayResult<()> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        if self.connection_failures.take() {
            return Err(GatewayError::BrokerConnection(
                "connection reset by peer".to_string(),
            ));
        }
        if self.refusals.take() {
            return Err(GatewayError::MessageQueue(
                "message refused by broker".to_string(),
            ));
        }
        self.inner.publish(routing_key, payload).await
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }

    async fn reconnect(&self) -> GatewayResult<()> {
        self.inner.reconnect().await
    }

    async fn close(&self) -> GatewayResult<()> {
        self.inner.close().await
    }
}
