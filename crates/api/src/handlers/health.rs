use std::collections::BTreeMap;

use axum::{extract::State, http::StatusCode, Json};
use gateway_core::CircuitState;
use serde_json::{json, Value};

use crate::routes::AppState;

/// 依赖健康检查，任一依赖不可用时返回 503
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let report = state.dispatcher.health().await;
    let breakers: BTreeMap<String, CircuitState> = state
        .dispatcher
        .list_breaker_states()
        .into_iter()
        .map(|(name, snapshot)| (name, snapshot.state))
        .collect();

    let healthy = report.is_healthy();
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if healthy { "healthy" } else { "unhealthy" },
            "checks": report,
            "circuit_breakers": breakers,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "service": "notification-gateway",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}
