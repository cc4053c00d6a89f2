use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use gateway_api::{create_app, AppState};
use gateway_core::config::{ApiConfig, ObservabilityConfig, RateLimitConfig};
use gateway_core::{CircuitBreakerRegistry, NotificationStatus};
use gateway_dispatcher::{IdempotencyStore, NotificationDispatcher};
use gateway_testing_utils::{
    fast_resilience_config, MockCache, MockIdempotencyRepository, MockNotificationRepository,
    MockPublisher,
};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestApp {
    router: Router,
    notifications: Arc<MockNotificationRepository>,
    publisher: Arc<MockPublisher>,
}

fn test_app() -> TestApp {
    test_app_with(ApiConfig::default())
}

fn test_app_with(api: ApiConfig) -> TestApp {
    let notifications = Arc::new(MockNotificationRepository::new());
    let publisher = Arc::new(MockPublisher::new());
    let store = IdempotencyStore::new(
        Arc::new(MockIdempotencyRepository::new()),
        Some(Arc::new(MockCache::new())),
        Duration::from_secs(60),
    );
    let dispatcher = NotificationDispatcher::new(
        notifications.clone(),
        publisher.clone(),
        store,
        Arc::new(CircuitBreakerRegistry::new()),
        &fast_resilience_config(2, 3, 1),
    );

    let router = create_app(
        AppState::new(Arc::new(dispatcher)),
        &api,
        &ObservabilityConfig::default(),
    );

    TestApp {
        router,
        notifications,
        publisher,
    }
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn notification(request_id: &str) -> Value {
    json!({
        "notification_type": "email",
        "user_id": "6f1c2b9e-8d0a-4c55-9a77-3b1f0e6d2c11",
        "template_code": "welcome_email",
        "variables": {"name": "Ada", "link": "https://example.com/verify"},
        "request_id": request_id,
        "priority": 2
    })
}

#[tokio::test]
async fn test_create_notification_accepted_then_replayed() {
    let app = test_app();

    let (status, first) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-1")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(first["success"], true);
    assert_eq!(first["data"]["notification_id"], "req-1");
    assert_eq!(first["data"]["status"], "queued");

    let (status, second) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-1")),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, second);
    assert_eq!(app.notifications.count(), 1);
    assert_eq!(app.publisher.published_count(), 1);
}

#[tokio::test]
async fn test_invalid_notification_is_bad_request() {
    let app = test_app();
    let mut body = notification("req-bad");
    body["priority"] = json!(42);

    let (status, response) = send(&app.router, "POST", "/api/v1/notifications", Some(body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["success"], false);
    assert_eq!(response["error"], "Validation failed");
    assert_eq!(response["message"], "Invalid request data");
    assert_eq!(app.notifications.count(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();
    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(json!({"notification_type": "sms"})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"], "Validation failed");
}

#[tokio::test]
async fn test_publish_failure_is_internal_error() {
    let app = test_app();
    app.publisher.fail_all_publishes();

    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-down")),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response["error"], "Queueing failed");
    assert_eq!(
        app.notifications.find("req-down").unwrap().status,
        NotificationStatus::Failed
    );
}

#[tokio::test]
async fn test_open_database_breaker_is_service_unavailable() {
    let app = test_app();
    // Two requests, two attempts each
    app.notifications.fail_next_creates(4);

    for i in 0..2 {
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/notifications",
            Some(notification(&format!("req-{i}"))),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }

    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-2")),
    )
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["error"], "Service temporarily unavailable");

    let (_, breakers) = send(&app.router, "GET", "/api/v1/circuit-breakers", None).await;
    assert_eq!(breakers["data"]["database"]["state"], "OPEN");

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/circuit-breakers/database/reset",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, breakers) = send(&app.router, "GET", "/api/v1/circuit-breakers", None).await;
    assert_eq!(breakers["data"]["database"]["state"], "CLOSED");
    assert_eq!(breakers["data"]["database"]["failure_count"], 0);
}

#[tokio::test]
async fn test_reset_all_breakers() {
    let app = test_app();
    app.notifications.fail_next_creates(4);
    for i in 0..2 {
        send(
            &app.router,
            "POST",
            "/api/v1/notifications",
            Some(notification(&format!("req-{i}"))),
        )
        .await;
    }
    let (_, breakers) = send(&app.router, "GET", "/api/v1/circuit-breakers", None).await;
    assert_eq!(breakers["data"]["database"]["state"], "OPEN");

    let (status, response) = send(&app.router, "POST", "/api/v1/circuit-breakers/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["success"], true);

    let (_, breakers) = send(&app.router, "GET", "/api/v1/circuit-breakers", None).await;
    assert_eq!(breakers["data"]["database"]["state"], "CLOSED");
    assert_eq!(breakers["data"]["broker"]["state"], "CLOSED");

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-after-reset")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_reset_unknown_breaker_is_not_found() {
    let app = test_app();
    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/circuit-breakers/nonexistent/reset",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["success"], false);
}

#[tokio::test]
async fn test_list_notifications_paginates() {
    let app = test_app();
    for i in 0..3 {
        send(
            &app.router,
            "POST",
            "/api/v1/notifications",
            Some(notification(&format!("req-{i}"))),
        )
        .await;
    }

    let (status, response) = send(
        &app.router,
        "GET",
        "/api/v1/notifications?page=1&limit=2",
        None,
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["message"], "Notifications retrieved successfully");
    assert_eq!(response["data"].as_array().unwrap().len(), 2);
    assert_eq!(response["data"][0]["request_id"], "req-2");
    assert_eq!(response["data"][0]["status"], "pending");
    assert_eq!(
        response["meta"],
        json!({
            "total": 3,
            "limit": 2,
            "page": 1,
            "total_pages": 2,
            "has_next": true,
            "has_previous": false
        })
    );

    let (status, _) = send(&app.router, "GET", "/api/v1/notifications?page=0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_status() {
    let app = test_app();
    send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-status")),
    )
    .await;

    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/email/status",
        Some(json!({"notification_id": "req-status", "status": "delivered"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["message"], "Status updated successfully");
    assert_eq!(
        app.notifications.find("req-status").unwrap().status,
        NotificationStatus::Delivered
    );

    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/email/status",
        Some(json!({"notification_id": "missing", "status": "failed"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["message"], "Notification not found");

    let (status, response) = send(
        &app.router,
        "POST",
        "/api/v1/email/status",
        Some(json!({"notification_id": "req-status", "status": "bounced"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["message"], "Invalid status update data");

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/sms/status",
        Some(json!({"notification_id": "req-status", "status": "failed"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_dependencies() {
    let app = test_app();

    let (status, response) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(response["status"], "healthy");
    assert_eq!(response["checks"]["database"], true);
    assert_eq!(response["circuit_breakers"]["broker"], "CLOSED");

    app.notifications.set_unhealthy(true);
    let (status, response) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(response["status"], "unhealthy");
    assert_eq!(response["checks"]["database"], false);
}

#[tokio::test]
async fn test_metrics_route_absent_without_exporter() {
    let app = test_app();
    let (status, _) = send(&app.router, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notifications_are_rate_limited() {
    let app = test_app_with(ApiConfig {
        rate_limit: RateLimitConfig {
            enabled: true,
            max_requests_per_minute: 1,
            burst_size: 1,
        },
        ..Default::default()
    });

    let (status, _) = send(
        &app.router,
        "POST",
        "/api/v1/notifications",
        Some(notification("req-1")),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let response = app
        .router
        .clone()
        .oneshot(
            Request::post("/api/v1/notifications")
                .header("content-type", "application/json")
                .body(Body::from(notification("req-2").to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key("retry-after"));
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Too many requests");

    // Rejected before dispatch
    assert!(app.notifications.find("req-2").is_none());
    assert_eq!(app.publisher.published_count(), 1);

    let (status, _) = send(&app.router, "GET", "/api/v1/notifications", None).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);

    // Other routes are not limited
    let (status, _) = send(&app.router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_disabled() {
    let app = test_app_with(ApiConfig {
        rate_limit: RateLimitConfig {
            enabled: false,
            max_requests_per_minute: 1,
            burst_size: 1,
        },
        ..Default::default()
    });

    for i in 0..3 {
        let (status, _) = send(
            &app.router,
            "POST",
            "/api/v1/notifications",
            Some(notification(&format!("req-{i}"))),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
    }
}
