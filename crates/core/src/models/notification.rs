use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;
use uuid::Uuid;

use crate::errors::{GatewayError, GatewayResult};

const MAX_FIELD_LENGTH: usize = 255;

fn default_priority() -> i32 {
    1
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Email,
    Push,
}

impl NotificationType {
    /// Also the broker routing key for this channel
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "email",
            NotificationType::Push => "push",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationType {
    type Err = GatewayError;

    fn from_str(s: &str) -> GatewayResult<Self> {
        match s {
            "email" => Ok(NotificationType::Email),
            "push" => Ok(NotificationType::Push),
            _ => Err(GatewayError::Validation(format!(
                "Invalid notification type: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum NotificationStatus {
    Pending,
    Delivered,
    Failed,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Delivered => "delivered",
            NotificationStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationStatus {
    type Err = GatewayError;

    fn from_str(s: &str) -> GatewayResult<Self> {
        match s {
            "pending" => Ok(NotificationStatus::Pending),
            "delivered" => Ok(NotificationStatus::Delivered),
            "failed" => Ok(NotificationStatus::Failed),
            _ => Err(GatewayError::Validation(format!(
                "Invalid notification status: {s}"
            ))),
        }
    }
}

impl sqlx::Type<sqlx::Postgres> for NotificationType {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for NotificationType {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for NotificationType {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

impl sqlx::Type<sqlx::Postgres> for NotificationStatus {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        sqlx::postgres::PgTypeInfo::with_name("VARCHAR")
    }
}

impl<'r> sqlx::Decode<'r, sqlx::Postgres> for NotificationStatus {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let s = <&str as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(s.parse()?)
    }
}

impl<'q> sqlx::Encode<'q, sqlx::Postgres> for NotificationStatus {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync>> {
        <&str as sqlx::Encode<sqlx::Postgres>>::encode(self.as_str(), buf)
    }
}

/// Template variables supplied by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationVariables {
    pub name: String,
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

/// Inbound request to send a notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationRequest {
    pub notification_type: NotificationType,
    pub user_id: Uuid,
    pub template_code: String,
    pub variables: NotificationVariables,
    /// Caller-supplied idempotency key
    pub request_id: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub metadata: Option<Value>,
}

impl NotificationRequest {
    pub fn validate(&self) -> GatewayResult<()> {
        check_text("template_code", &self.template_code)?;
        check_text("request_id", &self.request_id)?;
        check_text("variables.name", &self.variables.name)?;

        check_link("variables.link", &self.variables.link)?;

        if !(1..=10).contains(&self.priority) {
            return Err(GatewayError::Validation(format!(
                "priority must be between 1 and 10, got {}",
                self.priority
            )));
        }

        check_object("variables.meta", self.variables.meta.as_ref())?;
        check_object("metadata", self.metadata.as_ref())?;

        Ok(())
    }
}

/// Absolute http(s) URL with a non-empty host
fn check_link(field: &str, value: &str) -> GatewayResult<()> {
    check_text(field, value)?;
    let url = Url::parse(value)
        .map_err(|e| GatewayError::Validation(format!("{field} is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(GatewayError::Validation(format!(
            "{field} must use http or https, got {}",
            url.scheme()
        )));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(GatewayError::Validation(format!("{field} must include a host")));
    }
    Ok(())
}

fn check_text(field: &str, value: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::Validation(format!("{field} must not be empty")));
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(GatewayError::Validation(format!(
            "{field} must be at most {MAX_FIELD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn check_object(field: &str, value: Option<&Value>) -> GatewayResult<()> {
    match value {
        None | Some(Value::Null) | Some(Value::Object(_)) => Ok(()),
        Some(_) => Err(GatewayError::Validation(format!(
            "{field} must be a JSON object"
        ))),
    }
}

/// Persisted notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: Uuid,
    pub notification_type: NotificationType,
    pub user_id: Uuid,
    pub template_code: String,
    pub variables: NotificationVariables,
    pub request_id: String,
    pub priority: i32,
    pub status: NotificationStatus,
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields needed to create a [`NotificationRecord`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub user_id: Uuid,
    pub template_code: String,
    pub variables: NotificationVariables,
    pub request_id: String,
    pub priority: i32,
    pub status: NotificationStatus,
    pub metadata: Option<Value>,
}

impl NewNotification {
    pub fn from_request(request: &NotificationRequest) -> Self {
        Self {
            notification_type: request.notification_type,
            user_id: request.user_id,
            template_code: request.template_code.clone(),
            variables: request.variables.clone(),
            request_id: request.request_id.clone(),
            priority: request.priority,
            status: NotificationStatus::Pending,
            metadata: request.metadata.clone(),
        }
    }

    /// Audit record for a request rejected while the store's breaker is open.
    ///
    /// The caller's metadata is kept and `error` plus `circuit_breaker_open`
    /// are merged over it.
    pub fn rejected(request: &NotificationRequest, error: &str) -> Self {
        let mut metadata = match &request.metadata {
            Some(Value::Object(map)) => map.clone(),
            _ => serde_json::Map::new(),
        };
        metadata.insert("error".to_string(), Value::String(error.to_string()));
        metadata.insert("circuit_breaker_open".to_string(), Value::Bool(true));

        Self {
            status: NotificationStatus::Failed,
            metadata: Some(Value::Object(metadata)),
            ..Self::from_request(request)
        }
    }

    pub fn into_record(self, id: Uuid, now: DateTime<Utc>) -> NotificationRecord {
        NotificationRecord {
            id,
            notification_type: self.notification_type,
            user_id: self.user_id,
            template_code: self.template_code,
            variables: self.variables,
            request_id: self.request_id,
            priority: self.priority,
            status: self.status,
            metadata: self.metadata,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Payload published to the broker for asynchronous delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationMessage {
    pub notification_id: Uuid,
    pub user_id: Uuid,
    pub template_code: String,
    pub variables: NotificationVariables,
    pub request_id: String,
    pub priority: i32,
}

impl From<&NotificationRecord> for NotificationMessage {
    fn from(record: &NotificationRecord) -> Self {
        Self {
            notification_id: record.id,
            user_id: record.user_id,
            template_code: record.template_code.clone(),
            variables: record.variables.clone(),
            request_id: record.request_id.clone(),
            priority: record.priority,
        }
    }
}

/// Delivery status reported back by a downstream worker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    /// The `request_id` the notification was created with
    pub notification_id: String,
    pub status: NotificationStatus,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusUpdate {
    pub fn validate(&self) -> GatewayResult<()> {
        check_text("notification_id", &self.notification_id)
    }
}

/// One page of notifications, newest first
#[derive(Debug, Clone, Serialize)]
pub struct NotificationPage {
    pub items: Vec<NotificationRecord>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

impl NotificationPage {
    pub fn total_pages(&self) -> u64 {
        if self.limit == 0 {
            return 0;
        }
        self.total.div_ceil(u64::from(self.limit))
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages()
    }

    pub fn has_previous(&self) -> bool {
        self.page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> NotificationRequest {
        serde_json::from_value(json!({
            "notification_type": "email",
            "user_id": "6f1c2b9e-8d0a-4c55-9a77-3b1f0e6d2c11",
            "template_code": "welcome",
            "variables": {"name": "Ada", "link": "https://example.com/verify"},
            "request_id": "req-1",
            "metadata": {"campaign": "spring"}
        }))
        .unwrap()
    }

    #[test]
    fn test_request_defaults_and_validation() {
        let req = request();
        assert_eq!(req.priority, 1);
        assert!(req.validate().is_ok());

        let mut bad = req.clone();
        bad.priority = 11;
        assert!(matches!(bad.validate(), Err(GatewayError::Validation(_))));

        let mut bad = req.clone();
        bad.variables.link = "not a url".to_string();
        assert!(bad.validate().is_err());

        let mut bad = req;
        bad.metadata = Some(json!([1, 2]));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_link_must_be_http_url_with_host() {
        for link in [
            "https://",
            "http://",
            "http://exa mple.com/ x",
            "ftp://example.com/file",
            "mailto:ada@example.com",
        ] {
            let mut req = request();
            req.variables.link = link.to_string();
            assert!(
                matches!(req.validate(), Err(GatewayError::Validation(_))),
                "{link} should be rejected"
            );
        }

        for link in ["http://localhost:8080/verify?token=abc", "https://example.com"] {
            let mut req = request();
            req.variables.link = link.to_string();
            assert!(req.validate().is_ok(), "{link} should be accepted");
        }
    }

    #[test]
    fn test_unknown_notification_type_is_rejected() {
        let result: Result<NotificationRequest, _> = serde_json::from_value(json!({
            "notification_type": "sms",
            "user_id": "6f1c2b9e-8d0a-4c55-9a77-3b1f0e6d2c11",
            "template_code": "welcome",
            "variables": {"name": "Ada", "link": "https://example.com"},
            "request_id": "req-1"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_rejected_record_merges_metadata() {
        let new = NewNotification::rejected(&request(), "Circuit breaker database is OPEN");

        assert_eq!(new.status, NotificationStatus::Failed);
        let metadata = new.metadata.unwrap();
        assert_eq!(metadata["campaign"], "spring");
        assert_eq!(metadata["circuit_breaker_open"], true);
        assert_eq!(metadata["error"], "Circuit breaker database is OPEN");
    }

    #[test]
    fn test_message_payload_shape() {
        let record = NewNotification::from_request(&request()).into_record(Uuid::new_v4(), Utc::now());
        let payload = serde_json::to_value(NotificationMessage::from(&record)).unwrap();

        assert_eq!(payload["notification_id"], record.id.to_string());
        assert_eq!(payload["request_id"], "req-1");
        assert_eq!(payload["priority"], 1);
        assert_eq!(payload["variables"]["name"], "Ada");
        assert!(payload.get("status").is_none());
    }

    #[test]
    fn test_page_meta() {
        let page = NotificationPage {
            items: vec![],
            total: 45,
            page: 2,
            limit: 20,
        };
        assert_eq!(page.total_pages(), 3);
        assert!(page.has_next());
        assert!(page.has_previous());
    }
}
