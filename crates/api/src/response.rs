use axum::{response::IntoResponse, Json};
use gateway_core::NotificationPage;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PaginationMeta>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: None,
        }
    }

    pub fn paginated(data: T, meta: PaginationMeta, message: &str) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.to_string()),
            meta: Some(meta),
        }
    }
}

impl ApiResponse<()> {
    pub fn success_empty_with_message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            meta: None,
        }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> axum::response::Response {
        Json(self).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaginationMeta {
    pub total: u64,
    pub limit: u32,
    pub page: u32,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_previous: bool,
}

impl From<&NotificationPage> for PaginationMeta {
    fn from(page: &NotificationPage) -> Self {
        Self {
            total: page.total,
            limit: page.limit,
            page: page.page,
            total_pages: page.total_pages(),
            has_next: page.has_next(),
            has_previous: page.has_previous(),
        }
    }
}
