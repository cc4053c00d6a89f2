use std::future::Future;
use std::sync::Arc;

use gateway_core::{
    retry_with_backoff, CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry,
    GatewayResult, RetryPolicy,
};

/// 熔断器内嵌重试的调用包装
///
/// 重试发生在熔断器的一次准入之内：半开状态下的试探调用无论内部重试多少次
/// 都只对应一次状态转换，重试耗尽也只记作一次失败。
#[derive(Debug, Clone)]
pub struct ResilientCall {
    breaker: Arc<CircuitBreaker>,
    policy: RetryPolicy,
}

impl ResilientCall {
    pub fn new(breaker: Arc<CircuitBreaker>, policy: RetryPolicy) -> Self {
        Self { breaker, policy }
    }

    /// 从注册表获取（或创建）指定名称的熔断器
    pub fn from_registry(
        registry: &CircuitBreakerRegistry,
        name: &str,
        config: CircuitBreakerConfig,
        policy: RetryPolicy,
    ) -> Self {
        Self::new(registry.get_or_create(name, config), policy)
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// 执行操作
    ///
    /// 熔断器拒绝时返回 `CircuitOpen`，操作不会被调用；否则返回重试耗尽后的
    /// 原始错误。
    pub async fn execute<F, Fut, T>(&self, operation: F) -> GatewayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = GatewayResult<T>>,
    {
        let policy = &self.policy;
        self.breaker
            .call(move || retry_with_backoff(policy, operation))
            .await
    }
}
