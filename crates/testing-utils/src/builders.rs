//! Test data builders for creating notification requests

use gateway_core::{NotificationRequest, NotificationType, NotificationVariables};
use serde_json::Value;
use uuid::Uuid;

/// Builder for [`NotificationRequest`] with valid defaults
pub struct NotificationRequestBuilder {
    request: NotificationRequest,
}

impl NotificationRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: NotificationRequest {
                notification_type: NotificationType::Email,
                user_id: Uuid::new_v4(),
                template_code: "welcome_email".to_string(),
                variables: NotificationVariables {
                    name: "Test User".to_string(),
                    link: "https://example.com/welcome".to_string(),
                    meta: None,
                },
                request_id: format!("req-{}", Uuid::new_v4()),
                priority: 1,
                metadata: None,
            },
        }
    }

    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request.request_id = request_id.to_string();
        self
    }

    pub fn with_type(mut self, notification_type: NotificationType) -> Self {
        self.request.notification_type = notification_type;
        self
    }

    pub fn push(self) -> Self {
        self.with_type(NotificationType::Push)
    }

    pub fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.request.user_id = user_id;
        self
    }

    pub fn with_template_code(mut self, template_code: &str) -> Self {
        self.request.template_code = template_code.to_string();
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.request.variables.link = link.to_string();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.request.priority = priority;
        self
    }

    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.request.metadata = Some(metadata);
        self
    }

    pub fn build(self) -> NotificationRequest {
        self.request
    }
}

impl Default for NotificationRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
