use async_trait::async_trait;
use gateway_core::{
    GatewayError, GatewayResult, NewNotification, NotificationRecord, NotificationRepository,
    NotificationStatus, NotificationVariables,
};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::error_handling::{RepositoryErrorHelpers, RepositoryOperation};

const NOTIFICATION_COLUMNS: &str = "id, notification_type, user_id, template_code, variables, \
     request_id, priority, status, metadata, created_at, updated_at";

pub struct PostgresNotificationRepository {
    pool: PgPool,
}

impl PostgresNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &sqlx::postgres::PgRow) -> GatewayResult<NotificationRecord> {
        let variables: Json<NotificationVariables> = row.try_get("variables")?;
        Ok(NotificationRecord {
            id: row.try_get("id")?,
            notification_type: row.try_get("notification_type")?,
            user_id: row.try_get("user_id")?,
            template_code: row.try_get("template_code")?,
            variables: variables.0,
            request_id: row.try_get("request_id")?,
            priority: row.try_get("priority")?,
            status: row.try_get("status")?,
            metadata: row.try_get("metadata")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[async_trait]
impl NotificationRepository for PostgresNotificationRepository {
    #[instrument(skip(self, notification), fields(
        request_id = %notification.request_id,
        notification_type = %notification.notification_type,
        status = %notification.status,
    ))]
    async fn create(&self, notification: &NewNotification) -> GatewayResult<NotificationRecord> {
        let query = format!(
            "INSERT INTO notifications (id, notification_type, user_id, template_code, variables, \
             request_id, priority, status, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {NOTIFICATION_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(Uuid::new_v4())
            .bind(notification.notification_type)
            .bind(notification.user_id)
            .bind(&notification.template_code)
            .bind(Json(&notification.variables))
            .bind(&notification.request_id)
            .bind(notification.priority)
            .bind(notification.status)
            .bind(&notification.metadata)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(
                    RepositoryOperation::Create,
                    &format!("notification {}", notification.request_id),
                    e,
                )
            })?;

        let record = Self::row_to_record(&row)?;
        debug!(notification_id = %record.id, "Notification record created");
        Ok(record)
    }

    #[instrument(skip(self), fields(notification_id = %id, status = %status))]
    async fn update_status(&self, id: Uuid, status: NotificationStatus) -> GatewayResult<()> {
        let result =
            sqlx::query("UPDATE notifications SET status = $1, updated_at = NOW() WHERE id = $2")
                .bind(status)
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    RepositoryErrorHelpers::database_error(
                        RepositoryOperation::Update,
                        &format!("notification {id}"),
                        e,
                    )
                })?;

        if result.rows_affected() == 0 {
            return Err(GatewayError::notification_not_found(id.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(status = %status))]
    async fn update_status_by_request_id(
        &self,
        request_id: &str,
        status: NotificationStatus,
    ) -> GatewayResult<NotificationRecord> {
        let query = format!(
            "UPDATE notifications SET status = $1, updated_at = NOW() \
             WHERE request_id = $2 RETURNING {NOTIFICATION_COLUMNS}"
        );

        let row = sqlx::query(&query)
            .bind(status)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(
                    RepositoryOperation::Update,
                    &format!("notification {request_id}"),
                    e,
                )
            })?;

        match row {
            Some(row) => Self::row_to_record(&row),
            None => Err(GatewayError::notification_not_found(request_id)),
        }
    }

    #[instrument(skip(self))]
    async fn get_by_request_id(&self, request_id: &str) -> GatewayResult<Option<NotificationRecord>> {
        let query = format!("SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE request_id = $1");

        let row = sqlx::query(&query)
            .bind(request_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(
                    RepositoryOperation::Read,
                    &format!("notification {request_id}"),
                    e,
                )
            })?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    #[instrument(skip(self))]
    async fn list(&self, page: u32, limit: u32) -> GatewayResult<(Vec<NotificationRecord>, u64)> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let query = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        );

        let rows = sqlx::query(&query)
            .bind(i64::from(limit))
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(RepositoryOperation::Query, "notifications", e)
            })?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(RepositoryOperation::Query, "notifications", e)
            })?;

        let records = rows
            .iter()
            .map(Self::row_to_record)
            .collect::<GatewayResult<Vec<_>>>()?;

        Ok((records, total.max(0) as u64))
    }

    async fn health_check(&self) -> GatewayResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(RepositoryOperation::Query, "health check", e)
            })?;
        Ok(())
    }
}
