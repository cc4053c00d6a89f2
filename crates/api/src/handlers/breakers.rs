use std::collections::BTreeMap;

use axum::extract::{Path, State};
use gateway_core::CircuitBreakerSnapshot;

use crate::{error::ApiResult, response::ApiResponse, routes::AppState};

pub async fn list_circuit_breakers(
    State(state): State<AppState>,
) -> ApiResponse<BTreeMap<String, CircuitBreakerSnapshot>> {
    ApiResponse::success(state.dispatcher.list_breaker_states())
}

pub async fn reset_circuit_breaker(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    state.dispatcher.reset_breaker(&name)?;
    Ok(ApiResponse::success_empty_with_message(format!(
        "Circuit breaker {name} reset"
    )))
}

pub async fn reset_all_circuit_breakers(State(state): State<AppState>) -> ApiResponse<()> {
    state.dispatcher.reset_all_breakers();
    ApiResponse::success_empty_with_message("All circuit breakers reset")
}
