//! Common setup for dispatcher and API tests

use std::time::Duration;

use gateway_core::config::ResilienceConfig;
use gateway_core::{CircuitBreakerConfig, ErrorKind, RetryPolicy};

/// Resilience settings with the given thresholds and no backoff delays.
///
/// Each guarded call is attempted `retries + 1` times per breaker admission.
pub fn fast_resilience_config(
    database_threshold: u32,
    broker_threshold: u32,
    retries: u32,
) -> ResilienceConfig {
    ResilienceConfig {
        database_circuit_breaker: CircuitBreakerConfig::new(
            database_threshold,
            Duration::from_secs(60),
        ),
        broker_circuit_breaker: CircuitBreakerConfig::new(broker_threshold, Duration::from_secs(30))
            .with_counted_errors(vec![ErrorKind::Connection]),
        database_retry: RetryPolicy::immediate(retries),
        broker_retry: RetryPolicy::immediate(retries),
        status_update_retry: RetryPolicy::immediate(retries),
    }
}

/// Default thresholds (2 and 3) with two immediate retries
pub fn default_fast_resilience_config() -> ResilienceConfig {
    fast_resilience_config(2, 3, 2)
}
