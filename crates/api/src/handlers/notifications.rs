use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use gateway_core::{
    GatewayError, NotificationRecord, NotificationRequest, NotificationStatus, NotificationType,
    StatusUpdate,
};
use gateway_dispatcher::DispatchOutcome;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    response::{ApiResponse, PaginationMeta},
    routes::AppState,
};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ListParams {
    /// 缺省或为 0 的 limit 使用默认值，超过上限时截断
    fn page_size(&self) -> u32 {
        match self.limit {
            None | Some(0) => DEFAULT_PAGE_SIZE,
            Some(limit) => limit.min(MAX_PAGE_SIZE),
        }
    }
}

/// 列表中的通知摘要
#[derive(Debug, Serialize)]
pub struct NotificationSummary {
    pub id: Uuid,
    pub notification_type: NotificationType,
    pub user_id: Uuid,
    pub template_code: String,
    pub request_id: String,
    pub priority: i32,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRecord> for NotificationSummary {
    fn from(record: NotificationRecord) -> Self {
        Self {
            id: record.id,
            notification_type: record.notification_type,
            user_id: record.user_id,
            template_code: record.template_code,
            request_id: record.request_id,
            priority: record.priority,
            status: record.status,
            created_at: record.created_at,
        }
    }
}

/// 创建并分发通知
pub async fn create_notification(
    State(state): State<AppState>,
    payload: Result<Json<NotificationRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(request) = payload.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    let result = state
        .dispatcher
        .dispatch(&request)
        .await
        .map_err(|e| match e {
            GatewayError::Validation(details) => ApiError::invalid_request(details),
            other => ApiError::from(other),
        })?;

    let status = match result.outcome {
        DispatchOutcome::Replayed => StatusCode::OK,
        DispatchOutcome::Published => StatusCode::ACCEPTED,
        _ if result.circuit_open => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };

    Ok((status, Json(result.body)))
}

/// 分页查询通知
pub async fn list_notifications(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> ApiResult<ApiResponse<Vec<NotificationSummary>>> {
    let Query(params) = params.map_err(|e| ApiError::invalid_request(e.body_text()))?;

    let page = state
        .dispatcher
        .list_notifications(params.page.unwrap_or(1), params.page_size())
        .await
        .map_err(|e| ApiError::internal("Failed to retrieve notifications", e))?;

    let meta = PaginationMeta::from(&page);
    let items = page.items.into_iter().map(NotificationSummary::from).collect();

    Ok(ApiResponse::paginated(
        items,
        meta,
        "Notifications retrieved successfully",
    ))
}

/// 下游 Worker 回报投递状态
pub async fn update_notification_status(
    State(state): State<AppState>,
    Path(notification_type): Path<String>,
    payload: Result<Json<StatusUpdate>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    notification_type
        .parse::<NotificationType>()
        .map_err(|e| ApiError::invalid_status_update(e.to_string()))?;

    let Json(update) = payload.map_err(|e| ApiError::invalid_status_update(e.body_text()))?;
    update
        .validate()
        .map_err(|e| ApiError::invalid_status_update(e.to_string()))?;

    state
        .dispatcher
        .update_status(&update.notification_id, update.status)
        .await
        .map_err(|e| ApiError::internal("Failed to update status", e))?;

    info!(
        notification_id = %update.notification_id,
        status = %update.status,
        "通知状态已更新"
    );
    Ok(ApiResponse::success_empty_with_message(
        "Status updated successfully",
    ))
}
