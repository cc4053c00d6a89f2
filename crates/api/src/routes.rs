use std::sync::Arc;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use gateway_dispatcher::NotificationDispatcher;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{
    breakers::{list_circuit_breakers, reset_all_circuit_breakers, reset_circuit_breaker},
    health::health_check,
    metrics::metrics,
    notifications::{create_notification, list_notifications, update_notification_status},
};
use crate::middleware::rate_limiting;
use crate::rate_limit::RateLimiter;

/// API应用状态
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<NotificationDispatcher>,
    /// 未启用指标导出时为 `None`
    pub metrics: Option<PrometheusHandle>,
    /// 未启用限流时为 `None`
    pub rate_limiter: Option<Arc<RateLimiter>>,
}

impl AppState {
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            dispatcher,
            metrics: None,
            rate_limiter: None,
        }
    }

    pub fn with_rate_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

/// 创建API路由
pub fn create_routes(state: AppState, metrics_endpoint: &str) -> Router {
    // 通知
    let mut notifications = Router::new().route(
        "/api/v1/notifications",
        get(list_notifications).post(create_notification),
    );
    if let Some(limiter) = &state.rate_limiter {
        notifications =
            notifications.route_layer(from_fn_with_state(Arc::clone(limiter), rate_limiting));
    }

    let mut router = Router::new()
        // 健康检查
        .route("/health", get(health_check))
        .merge(notifications)
        .route(
            "/api/v1/{notification_type}/status",
            post(update_notification_status),
        )
        // 熔断器管理
        .route("/api/v1/circuit-breakers", get(list_circuit_breakers))
        .route(
            "/api/v1/circuit-breakers/reset",
            post(reset_all_circuit_breakers),
        )
        .route(
            "/api/v1/circuit-breakers/{name}/reset",
            post(reset_circuit_breaker),
        );

    if state.metrics.is_some() {
        router = router.route(metrics_endpoint, get(metrics));
    }

    router.with_state(state)
}
