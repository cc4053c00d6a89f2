use async_trait::async_trait;
use gateway_core::{GatewayResult, IdempotencyEntry, IdempotencyRepository};
use sqlx::{PgPool, Row};
use tracing::instrument;

use crate::error_handling::{RepositoryErrorHelpers, RepositoryOperation};

pub struct PostgresIdempotencyRepository {
    pool: PgPool,
}

impl PostgresIdempotencyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl IdempotencyRepository for PostgresIdempotencyRepository {
    #[instrument(skip(self))]
    async fn get_entry(&self, key: &str) -> GatewayResult<Option<IdempotencyEntry>> {
        let row = sqlx::query("SELECT key, response, created_at FROM idempotency_keys WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(
                    RepositoryOperation::Read,
                    &format!("idempotency key {key}"),
                    e,
                )
            })?;

        match row {
            Some(row) => Ok(Some(IdempotencyEntry {
                key: row.try_get("key")?,
                response: row.try_get("response")?,
                created_at: row.try_get("created_at")?,
            })),
            None => Ok(None),
        }
    }

    #[instrument(skip(self, entry), fields(key = %entry.key))]
    async fn put_entry(&self, entry: &IdempotencyEntry) -> GatewayResult<()> {
        sqlx::query("INSERT INTO idempotency_keys (key, response, created_at) VALUES ($1, $2, $3)")
            .bind(&entry.key)
            .bind(&entry.response)
            .bind(entry.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                RepositoryErrorHelpers::database_error(
                    RepositoryOperation::Create,
                    &format!("idempotency key {}", entry.key),
                    e,
                )
            })?;
        Ok(())
    }
}
