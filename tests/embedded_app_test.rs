use std::time::Duration;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
};
use gateway_core::AppConfig;
use gateway_testing_utils::NotificationRequestBuilder;
use notification_gateway::{AppMode, Application, ShutdownManager};
use serde_json::Value;
use tokio::time::timeout;
use tower::ServiceExt;

fn embedded_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.api.bind_address = "127.0.0.1:0".to_string();
    // 全局指标记录器每个进程只能安装一次
    config.observability.metrics_enabled = false;
    config
}

async fn call(app: &Application, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.router().oneshot(request).await?;
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok((status, serde_json::from_slice(&bytes)?))
}

/// 嵌入式模式下完整走一遍创建、重放和查询
#[tokio::test]
async fn test_embedded_dispatch_flow() -> Result<()> {
    let app = Application::new(embedded_config(), AppMode::Embedded).await?;
    assert_eq!(app.mode(), AppMode::Embedded);

    let body = serde_json::to_string(
        &NotificationRequestBuilder::new()
            .with_request_id("req-embedded")
            .build(),
    )?;
    let post = || {
        Request::post("/api/v1/notifications")
            .header("content-type", "application/json")
            .body(Body::from(body.clone()))
    };

    let (status, first) = call(&app, post()?).await?;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["data"]["notification_id"], "req-embedded");

    let (status, replay) = call(&app, post()?).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, replay);

    let (status, list) = call(
        &app,
        Request::get("/api/v1/notifications").body(Body::empty())?,
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["meta"]["total"], 1);

    Ok(())
}

#[tokio::test]
async fn test_embedded_health_is_healthy() -> Result<()> {
    let app = Application::new(embedded_config(), AppMode::Embedded).await?;

    let (status, health) = call(&app, Request::get("/health").body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["checks"]["database"], true);
    assert_eq!(health["checks"]["cache"], true);
    assert_eq!(health["checks"]["message_queue"], true);
    assert_eq!(health["circuit_breakers"]["database"], "CLOSED");
    Ok(())
}

#[tokio::test]
async fn test_embedded_without_cache() -> Result<()> {
    let mut config = embedded_config();
    config.cache.enabled = false;
    let app = Application::new(config, AppMode::Embedded).await?;

    let (status, health) = call(&app, Request::get("/health").body(Body::empty())?).await?;

    assert_eq!(status, StatusCode::OK);
    assert!(health["checks"]["cache"].is_null());
    Ok(())
}

#[tokio::test]
async fn test_run_stops_on_shutdown_signal() -> Result<()> {
    let app = std::sync::Arc::new(Application::new(embedded_config(), AppMode::Embedded).await?);
    let shutdown = ShutdownManager::new();

    let handle = {
        let app = app.clone();
        let rx = shutdown.subscribe();
        tokio::spawn(async move { app.run(rx).await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.shutdown();

    let result = timeout(Duration::from_secs(5), handle).await??;
    assert!(result.is_ok());
    // 关闭后内存消息队列不再接受发布
    assert!(!app.dispatcher().broker_connected().await);
    Ok(())
}
