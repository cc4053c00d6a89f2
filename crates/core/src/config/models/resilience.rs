use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::circuit_breaker::CircuitBreakerConfig;
use crate::errors::{ErrorKind, GatewayResult};
use crate::retry::RetryPolicy;

/// Registry name of the breaker guarding the notification store
pub const DATABASE_BREAKER: &str = "database";
/// Registry name of the breaker guarding the message broker
pub const BROKER_BREAKER: &str = "broker";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceConfig {
    pub database_circuit_breaker: CircuitBreakerConfig,
    pub broker_circuit_breaker: CircuitBreakerConfig,
    /// Retries inside a single `database` breaker admission
    pub database_retry: RetryPolicy,
    /// Retries inside a single `broker` breaker admission
    pub broker_retry: RetryPolicy,
    /// Bookkeeping writes made outside any breaker
    pub status_update_retry: RetryPolicy,
}

impl Default for ResilienceConfig {
    fn default() -> Self {
        let retry = RetryPolicy::new(2, Duration::from_secs(1), Duration::from_secs(30));

        Self {
            database_circuit_breaker: CircuitBreakerConfig::new(2, Duration::from_secs(60)),
            broker_circuit_breaker: CircuitBreakerConfig::new(3, Duration::from_secs(30))
                .with_counted_errors(vec![ErrorKind::Connection]),
            database_retry: retry.clone(),
            broker_retry: retry.clone(),
            status_update_retry: retry,
        }
    }
}

impl ResilienceConfig {
    pub fn validate(&self) -> GatewayResult<()> {
        self.database_circuit_breaker.validate()?;
        self.broker_circuit_breaker.validate()?;
        self.database_retry.validate()?;
        self.broker_retry.validate()?;
        self.status_update_retry.validate()?;
        Ok(())
    }
}
