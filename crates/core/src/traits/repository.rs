//! Persistence interfaces for notifications and idempotency records.
//!
//! Implementations live in `gateway-infrastructure` (PostgreSQL and
//! in-memory). All methods are async and report failures as
//! [`GatewayError`](crate::errors::GatewayError) so callers can classify them
//! by [`ErrorKind`](crate::errors::ErrorKind).

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::GatewayResult;
use crate::models::{IdempotencyEntry, NewNotification, NotificationRecord, NotificationStatus};

/// Notification record store
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Insert a new record; a duplicate `request_id` fails with `Conflict`
    async fn create(&self, notification: &NewNotification) -> GatewayResult<NotificationRecord>;

    /// Set the status of the record with id `id`
    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> GatewayResult<()>;

    /// Set the status of the record created for `request_id`.
    ///
    /// Fails with `NotificationNotFound` when no such record exists.
    async fn update_status_by_request_id(
        &self,
        request_id: &str,
        status: NotificationStatus,
    ) -> GatewayResult<NotificationRecord>;

    async fn get_by_request_id(&self, request_id: &str)
        -> GatewayResult<Option<NotificationRecord>>;

    /// One page (1-based) of records ordered newest first, plus the total count
    async fn list(&self, page: u32, limit: u32) -> GatewayResult<(Vec<NotificationRecord>, u64)>;

    /// Whether the backing store answers queries
    async fn health_check(&self) -> GatewayResult<()> {
        Ok(())
    }
}

/// Durable, write-once idempotency record store
#[async_trait]
pub trait IdempotencyRepository: Send + Sync {
    async fn get_entry(&self, key: &str) -> GatewayResult<Option<IdempotencyEntry>>;

    /// Insert an entry; an existing key fails with `Conflict`
    async fn put_entry(&self, entry: &IdempotencyEntry) -> GatewayResult<()>;
}
