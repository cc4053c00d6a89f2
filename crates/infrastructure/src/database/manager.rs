use std::sync::Arc;
use std::time::Duration;

use gateway_core::config::DatabaseConfig;
use gateway_core::{GatewayError, GatewayResult, IdempotencyRepository, NotificationRepository};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use super::postgres::{PostgresIdempotencyRepository, PostgresNotificationRepository};

/// 数据库连接池管理器
pub struct DatabaseManager {
    pool: PgPool,
}

impl DatabaseManager {
    /// 按配置建立连接池
    pub async fn connect(config: &DatabaseConfig) -> GatewayResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .idle_timeout(Duration::from_secs(config.idle_timeout_seconds))
            .max_lifetime(Duration::from_secs(1800))
            .connect(&config.url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "数据库连接池已建立"
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 运行数据库迁移
    pub async fn migrate(&self) -> GatewayResult<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| GatewayError::DatabaseOperation(format!("migration failed: {e}")))?;
        info!("数据库迁移完成");
        Ok(())
    }

    pub async fn health_check(&self) -> GatewayResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    pub fn notification_repository(&self) -> Arc<dyn NotificationRepository> {
        Arc::new(PostgresNotificationRepository::new(self.pool.clone()))
    }

    pub fn idempotency_repository(&self) -> Arc<dyn IdempotencyRepository> {
        Arc::new(PostgresIdempotencyRepository::new(self.pool.clone()))
    }
}
