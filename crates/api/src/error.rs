use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use gateway_core::{ErrorKind, GatewayError};
use serde_json::json;
use tracing::error;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("验证错误: {details}")]
    Validation {
        message: &'static str,
        details: String,
    },

    #[error("{message}: {source}")]
    Internal {
        message: &'static str,
        #[source]
        source: GatewayError,
    },

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    /// 通知创建请求无效
    pub fn invalid_request(details: impl Into<String>) -> Self {
        ApiError::Validation {
            message: "Invalid request data",
            details: details.into(),
        }
    }

    /// 状态更新请求无效
    pub fn invalid_status_update(details: impl Into<String>) -> Self {
        ApiError::Validation {
            message: "Invalid status update data",
            details: details.into(),
        }
    }

    /// 未找到的资源按原样返回，其余错误统一为 500 并使用给定提示
    pub fn internal(message: &'static str, source: GatewayError) -> Self {
        match source.kind() {
            ErrorKind::NotFound | ErrorKind::Validation => ApiError::Gateway(source),
            _ => ApiError::Internal { message, source },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Validation { message, details } => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Validation failed",
                    "message": message,
                    "data": details
                }),
            ),
            ApiError::Gateway(GatewayError::Validation(details)) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "success": false,
                    "error": "Validation failed",
                    "message": "Invalid request data",
                    "data": details
                }),
            ),
            ApiError::Gateway(GatewayError::NotificationNotFound { .. }) => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "error": "Not found",
                    "message": "Notification not found"
                }),
            ),
            ApiError::Gateway(GatewayError::BreakerNotFound { name }) => (
                StatusCode::NOT_FOUND,
                json!({
                    "success": false,
                    "error": "Not found",
                    "message": format!("Circuit breaker {name} not found")
                }),
            ),
            ApiError::Gateway(GatewayError::CircuitOpen { .. }) => (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({
                    "success": false,
                    "error": "Service temporarily unavailable",
                    "message": "Please retry later"
                }),
            ),
            ApiError::Internal { message, source } => {
                error!(error = %source, "{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": "Internal server error",
                        "message": message
                    }),
                )
            }
            ApiError::Gateway(e) => {
                error!(error = %e, "请求处理失败");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "success": false,
                        "error": "Internal server error",
                        "message": "An error occurred while processing your request"
                    }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
