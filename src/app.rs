use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use gateway_api::{create_app, AppState};
use gateway_core::{
    AppConfig, CacheService, CircuitBreakerRegistry, IdempotencyRepository, MessagePublisher,
    NotificationRepository,
};
use gateway_dispatcher::{IdempotencyStore, NotificationDispatcher};
use gateway_infrastructure::{
    DatabaseManager, InMemoryCache, InMemoryIdempotencyRepository, InMemoryNotificationRepository,
    InMemoryPublisher, RabbitMQPublisher, RedisCacheManager,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info, warn};

/// 应用运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppMode {
    /// PostgreSQL + Redis + RabbitMQ
    Server,
    /// 全部使用内存实现，无外部依赖
    Embedded,
}

impl FromStr for AppMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "server" => Ok(AppMode::Server),
            "embedded" => Ok(AppMode::Embedded),
            other => Err(anyhow::anyhow!("不支持的运行模式: {other}")),
        }
    }
}

impl fmt::Display for AppMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppMode::Server => write!(f, "server"),
            AppMode::Embedded => write!(f, "embedded"),
        }
    }
}

/// 组装好的依赖
struct Backends {
    notifications: Arc<dyn NotificationRepository>,
    idempotency: Arc<dyn IdempotencyRepository>,
    cache: Option<Arc<dyn CacheService>>,
    publisher: Arc<dyn MessagePublisher>,
    database: Option<DatabaseManager>,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    dispatcher: Arc<NotificationDispatcher>,
    publisher: Arc<dyn MessagePublisher>,
    database: Option<DatabaseManager>,
    metrics: Option<PrometheusHandle>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {mode}");

        let backends = match mode {
            AppMode::Server => server_backends(&config).await?,
            AppMode::Embedded => embedded_backends(&config),
        };

        let metrics = if config.observability.metrics_enabled {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .context("安装Prometheus指标记录器失败")?;
            Some(handle)
        } else {
            None
        };

        let store = IdempotencyStore::new(
            backends.idempotency,
            backends.cache,
            config.cache.idempotency_ttl(),
        );
        let dispatcher = NotificationDispatcher::new(
            backends.notifications,
            Arc::clone(&backends.publisher),
            store,
            Arc::new(CircuitBreakerRegistry::new()),
            &config.resilience,
        );

        Ok(Self {
            config,
            mode,
            dispatcher: Arc::new(dispatcher),
            publisher: backends.publisher,
            database: backends.database,
            metrics,
        })
    }

    pub fn mode(&self) -> AppMode {
        self.mode
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// 构建HTTP路由
    pub fn router(&self) -> Router {
        let mut state = AppState::new(Arc::clone(&self.dispatcher));
        if let Some(handle) = &self.metrics {
            state = state.with_metrics(handle.clone());
        }
        create_app(state, &self.config.api, &self.config.observability)
    }

    /// 运行HTTP服务直到收到关闭信号，然后释放外部连接
    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        let bind_address = &self.config.api.bind_address;
        let listener = TcpListener::bind(bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {bind_address}"))?;

        info!("API服务器启动在: {bind_address}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                info!("API服务器收到关闭信号");
            })
            .await
            .context("API服务器运行失败")?;

        self.close().await;
        Ok(())
    }

    async fn close(&self) {
        if let Err(e) = self.publisher.close().await {
            warn!("关闭消息队列连接失败: {e}");
        }
        if let Some(database) = &self.database {
            database.close().await;
        }
        info!("外部连接已关闭");
    }
}

async fn server_backends(config: &AppConfig) -> Result<Backends> {
    let database = DatabaseManager::connect(&config.database)
        .await
        .context("连接数据库失败")?;

    if config.database.run_migrations {
        database.migrate().await.context("数据库迁移失败")?;
        info!("数据库迁移完成");
    }

    // 缓存是可选的加速层，连接失败时只用持久存储
    let cache: Option<Arc<dyn CacheService>> = if config.cache.enabled {
        match RedisCacheManager::new(&config.cache).await {
            Ok(cache) => Some(Arc::new(cache)),
            Err(e) => {
                warn!("Redis缓存不可用，幂等查询将直接访问数据库: {e}");
                None
            }
        }
    } else {
        None
    };

    // 消息队列不可用时仍然启动，首次发布时重连
    let publisher = match RabbitMQPublisher::connect(config.message_queue.clone()).await {
        Ok(publisher) => publisher,
        Err(e) => {
            error!("连接RabbitMQ失败，将在首次发布时重试: {e}");
            RabbitMQPublisher::new(config.message_queue.clone())
        }
    };

    Ok(Backends {
        notifications: database.notification_repository(),
        idempotency: database.idempotency_repository(),
        cache,
        publisher: Arc::new(publisher),
        database: Some(database),
    })
}

fn embedded_backends(config: &AppConfig) -> Backends {
    let cache: Option<Arc<dyn CacheService>> = if config.cache.enabled {
        Some(Arc::new(InMemoryCache::new()))
    } else {
        None
    };

    Backends {
        notifications: Arc::new(InMemoryNotificationRepository::new()),
        idempotency: Arc::new(InMemoryIdempotencyRepository::new()),
        cache,
        publisher: Arc::new(InMemoryPublisher::from_config(&config.message_queue)),
        database: None,
    }
}
