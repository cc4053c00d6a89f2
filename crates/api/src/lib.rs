//! # Gateway API
//!
//! 通知网关的 HTTP 接口，基于 Axum。
//!
//! - `POST /api/v1/notifications` - 创建并分发通知（202 已入队，200 幂等重放，
//!   503 熔断器打开，500 投递失败，400 请求无效）
//! - `GET /api/v1/notifications?page=&limit=` - 分页查询
//! - `POST /api/v1/{notification_type}/status` - 下游状态回报
//! - `GET /api/v1/circuit-breakers` - 熔断器状态
//! - `POST /api/v1/circuit-breakers/{name}/reset` - 手动重置熔断器
//! - `POST /api/v1/circuit-breakers/reset` - 重置全部熔断器
//! - `GET /health` - 依赖健康检查
//! - `GET /metrics` - Prometheus 指标（启用时）
//!
//! 通知接口受 `api.rate_limit` 令牌桶限流，超出时返回 429。

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limit;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use gateway_core::config::{ApiConfig, ObservabilityConfig};
use tower::ServiceBuilder;

use middleware::{cors_layer, request_logging, timeout_layer, trace_layer};
pub use rate_limit::RateLimiter;
pub use routes::{create_routes, AppState};

/// 创建完整的API应用
pub fn create_app(state: AppState, api: &ApiConfig, observability: &ObservabilityConfig) -> Router {
    let state = if api.rate_limit.enabled {
        state.with_rate_limiter(Arc::new(RateLimiter::new(&api.rate_limit)))
    } else {
        state
    };

    let router = create_routes(state, &observability.metrics_endpoint).layer(
        ServiceBuilder::new()
            .layer(trace_layer())
            .layer(timeout_layer(api.request_timeout_seconds))
            .layer(axum::middleware::from_fn(request_logging)),
    );

    if api.cors_enabled {
        router.layer(cors_layer(&api.cors_origins))
    } else {
        router
    }
}
