use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use gateway_core::config::models::resilience::{BROKER_BREAKER, DATABASE_BREAKER};
use gateway_core::config::ResilienceConfig;
use gateway_core::{
    retry_with_backoff, CircuitBreakerRegistry, CircuitBreakerSnapshot, GatewayError,
    GatewayResult, MessagePublisher, NewNotification, NotificationMessage, NotificationPage,
    NotificationRecord, NotificationRepository, NotificationRequest, NotificationStatus,
    RetryPolicy,
};

use crate::idempotency_store::IdempotencyStore;
use crate::resilient_call::ResilientCall;

/// 单个请求的终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchOutcome {
    /// 幂等命中，返回首次响应
    Replayed,
    /// 记录已创建并成功投递到消息队列
    Published,
    /// 记录已创建但投递失败，记录被标记为 failed
    PublishFailed,
    /// 存储熔断器打开，仅留下一条 failed 审计记录
    Rejected,
    /// 记录创建失败，没有留下记录
    RecordFailed,
}

impl DispatchOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchOutcome::Replayed => "replayed",
            DispatchOutcome::Published => "published",
            DispatchOutcome::PublishFailed => "publish_failed",
            DispatchOutcome::Rejected => "rejected",
            DispatchOutcome::RecordFailed => "record_failed",
        }
    }
}

/// 分发结果，调用方不会看到内部错误
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    pub outcome: DispatchOutcome,
    pub success: bool,
    /// 因熔断器打开而失败（区别于下游重试耗尽）
    pub circuit_open: bool,
    pub body: Value,
}

impl DispatchResult {
    fn new(outcome: DispatchOutcome, body: Value) -> Self {
        Self {
            outcome,
            success: outcome == DispatchOutcome::Published,
            circuit_open: false,
            body,
        }
    }

    fn replayed(body: Value) -> Self {
        Self {
            outcome: DispatchOutcome::Replayed,
            success: body.get("success").and_then(Value::as_bool).unwrap_or(true),
            circuit_open: false,
            body,
        }
    }

    fn circuit_open(outcome: DispatchOutcome) -> Self {
        Self {
            circuit_open: true,
            ..Self::new(outcome, unavailable_body())
        }
    }
}

/// 依赖健康状态
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub database: bool,
    /// 未配置缓存时为 `None`
    pub cache: Option<bool>,
    pub message_queue: bool,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.database && self.cache.unwrap_or(true) && self.message_queue
    }
}

pub fn success_body(request_id: &str) -> Value {
    json!({
        "success": true,
        "data": {
            "notification_id": request_id,
            "status": "queued"
        },
        "message": "Notification queued successfully"
    })
}

pub fn unavailable_body() -> Value {
    json!({
        "success": false,
        "error": "Service temporarily unavailable",
        "message": "Notification could not be queued, please retry later"
    })
}

pub fn queueing_failed_body() -> Value {
    json!({
        "success": false,
        "error": "Queueing failed",
        "message": "Failed to queue notification"
    })
}

/// 通知分发服务
///
/// 流程：幂等检查 → 创建记录（database 熔断器 + 重试）→ 投递（broker 熔断器 +
/// 重试）→ 成功时保存幂等响应，失败时把记录标记为 failed。
pub struct NotificationDispatcher {
    notifications: Arc<dyn NotificationRepository>,
    publisher: Arc<dyn MessagePublisher>,
    idempotency: IdempotencyStore,
    registry: Arc<CircuitBreakerRegistry>,
    database: ResilientCall,
    broker: ResilientCall,
    status_retry: RetryPolicy,
}

impl NotificationDispatcher {
    pub fn new(
        notifications: Arc<dyn NotificationRepository>,
        publisher: Arc<dyn MessagePublisher>,
        idempotency: IdempotencyStore,
        registry: Arc<CircuitBreakerRegistry>,
        resilience: &ResilienceConfig,
    ) -> Self {
        let database = ResilientCall::from_registry(
            &registry,
            DATABASE_BREAKER,
            resilience.database_circuit_breaker.clone(),
            resilience.database_retry.clone(),
        );
        let broker = ResilientCall::from_registry(
            &registry,
            BROKER_BREAKER,
            resilience.broker_circuit_breaker.clone(),
            resilience.broker_retry.clone(),
        );

        Self {
            notifications,
            publisher,
            idempotency,
            registry,
            database,
            broker,
            status_retry: resilience.status_update_retry.clone(),
        }
    }

    pub fn registry(&self) -> &Arc<CircuitBreakerRegistry> {
        &self.registry
    }

    /// 分发一条通知
    ///
    /// 仅在请求校验失败时返回错误，其余失败都体现在 [`DispatchResult`] 中。
    #[instrument(skip(self, request), fields(request_id = %request.request_id))]
    pub async fn dispatch(&self, request: &NotificationRequest) -> GatewayResult<DispatchResult> {
        request.validate()?;

        let result = self.run_protocol(request).await;

        metrics::counter!(
            "gateway_dispatch_total",
            "outcome" => result.outcome.as_str(),
            "notification_type" => request.notification_type.as_str()
        )
        .increment(1);

        Ok(result)
    }

    async fn run_protocol(&self, request: &NotificationRequest) -> DispatchResult {
        if let Some(body) = self.check_idempotent(&request.request_id).await {
            info!("检测到幂等请求，返回已保存的响应");
            return DispatchResult::replayed(body);
        }

        let new = NewNotification::from_request(request);
        let record = match self
            .database
            .execute(|| self.notifications.create(&new))
            .await
        {
            Ok(record) => record,
            Err(e) if e.is_circuit_open() => {
                error!(error = %e, "熔断器阻止了通知创建");
                self.record_rejected(request, &e).await;
                return DispatchResult::circuit_open(DispatchOutcome::Rejected);
            }
            Err(e) => {
                error!(error = %e, "创建通知记录失败");
                return DispatchResult::new(DispatchOutcome::RecordFailed, queueing_failed_body());
            }
        };

        match self.publish(request, &record).await {
            Ok(()) => {
                info!(notification_id = %record.id, "通知已成功入队");
                let body = success_body(&request.request_id);
                // 幂等记录写入失败不影响本次结果
                let _ = self.idempotency.store(&request.request_id, &body).await;
                DispatchResult::new(DispatchOutcome::Published, body)
            }
            Err(e) => {
                error!(notification_id = %record.id, error = %e, "投递通知失败");
                self.mark_failed(record.id).await;
                if e.is_circuit_open() {
                    DispatchResult::circuit_open(DispatchOutcome::PublishFailed)
                } else {
                    DispatchResult::new(DispatchOutcome::PublishFailed, queueing_failed_body())
                }
            }
        }
    }

    async fn publish(
        &self,
        request: &NotificationRequest,
        record: &NotificationRecord,
    ) -> GatewayResult<()> {
        let payload = serde_json::to_vec(&NotificationMessage::from(record))?;
        let routing_key = request.notification_type.as_str();

        self.broker
            .execute(|| self.publisher.publish(routing_key, &payload))
            .await
    }

    /// 存储熔断器打开时，绕过熔断器直接写入一条 failed 审计记录
    async fn record_rejected(&self, request: &NotificationRequest, cause: &GatewayError) {
        let new = NewNotification::rejected(request, &cause.to_string());
        let created = retry_with_backoff(&self.status_retry, || self.notifications.create(&new)).await;

        if let Err(e) = created {
            error!(error = %e, "熔断器打开期间写入审计记录也失败了");
        }
    }

    async fn mark_failed(&self, id: Uuid) {
        let updated = retry_with_backoff(&self.status_retry, || {
            self.notifications.update_status(id, NotificationStatus::Failed)
        })
        .await;

        if let Err(e) = updated {
            warn!(notification_id = %id, error = %e, "更新通知状态为 failed 失败");
        }
    }

    /// 查询幂等响应，任何失败都视为不存在
    pub async fn check_idempotent(&self, request_id: &str) -> Option<Value> {
        self.idempotency.lookup(request_id).await
    }

    pub fn list_breaker_states(&self) -> BTreeMap<String, CircuitBreakerSnapshot> {
        self.registry.snapshot_all()
    }

    pub fn reset_breaker(&self, name: &str) -> GatewayResult<()> {
        self.registry.reset(name)
    }

    pub fn reset_all_breakers(&self) {
        self.registry.reset_all()
    }

    /// 下游 Worker 回报的状态更新，按 request_id 定位记录
    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        request_id: &str,
        status: NotificationStatus,
    ) -> GatewayResult<NotificationRecord> {
        let record = self
            .notifications
            .update_status_by_request_id(request_id, status)
            .await?;
        info!(status = %status, "通知状态已更新");
        Ok(record)
    }

    /// 分页查询通知，按创建时间倒序
    pub async fn list_notifications(&self, page: u32, limit: u32) -> GatewayResult<NotificationPage> {
        if page == 0 || limit == 0 {
            return Err(GatewayError::Validation(
                "page and limit must be greater than 0".to_string(),
            ));
        }

        let (items, total) = self.notifications.list(page, limit).await?;
        Ok(NotificationPage {
            items,
            total,
            page,
            limit,
        })
    }

    /// 消息队列连接状态
    pub async fn broker_connected(&self) -> bool {
        self.publisher.is_connected().await
    }

    /// 检查存储、缓存和消息队列
    pub async fn health(&self) -> HealthReport {
        let database = match self.notifications.health_check().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "数据库健康检查失败");
                false
            }
        };

        HealthReport {
            database,
            cache: self.idempotency.cache_healthy().await,
            message_queue: self.broker_connected().await,
        }
    }
}
