//! 通知分发
//!
//! 在存储和消息队列两个不可靠依赖之前组合熔断器、重试和幂等存储。

pub mod dispatch_service;
pub mod idempotency_store;
pub mod resilient_call;

pub use dispatch_service::{
    queueing_failed_body, success_body, unavailable_body, DispatchOutcome, DispatchResult,
    HealthReport, NotificationDispatcher,
};
pub use idempotency_store::{cache_key, IdempotencyStore, DEFAULT_IDEMPOTENCY_TTL};
pub use resilient_call::ResilientCall;
