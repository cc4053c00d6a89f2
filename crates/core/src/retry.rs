//! Exponential backoff and bounded retry execution.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::errors::{GatewayError, GatewayResult};

/// Symmetric jitter applied around the exponential delay (±10%)
pub const JITTER_RATIO: f64 = 0.1;

/// `min(base * 2^attempt, cap)`, saturating to `cap` on overflow.
pub fn exponential_delay(attempt: u32, base: Duration, cap: Duration) -> Duration {
    2u32.checked_pow(attempt)
        .and_then(|factor| base.checked_mul(factor))
        .map_or(cap, |delay| delay.min(cap))
}

/// Backoff delay before retry `attempt` (0-based), with jitter drawn from `rng`.
///
/// Deterministic for a seeded `rng`, never negative.
pub fn backoff_delay<R: Rng + ?Sized>(
    attempt: u32,
    base: Duration,
    cap: Duration,
    rng: &mut R,
) -> Duration {
    let raw = exponential_delay(attempt, base, cap);
    let jitter = rng.random_range(-JITTER_RATIO..=JITTER_RATIO);
    Duration::from_secs_f64((raw.as_secs_f64() * (1.0 + jitter)).max(0.0))
}

/// Retry policy configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = max_retries + 1
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
        }
    }

    /// Retries without sleeping between attempts
    pub fn immediate(max_retries: u32) -> Self {
        Self {
            max_retries,
            base_delay_ms: 0,
            max_delay_ms: 0,
        }
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn validate(&self) -> GatewayResult<()> {
        if self.base_delay_ms > self.max_delay_ms {
            return Err(GatewayError::Configuration(format!(
                "base_delay_ms ({}) must not exceed max_delay_ms ({})",
                self.base_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }
}

/// A failed attempt that will be retried
#[derive(Debug, Clone)]
pub struct RetryAttempt {
    /// 0-based index of the attempt that failed
    pub attempt: u32,
    /// Delay before the next attempt
    pub delay: Duration,
    pub error: String,
}

/// Run `operation` up to `policy.max_retries + 1` times.
///
/// Sleeps with jittered exponential backoff between attempts. Every error is
/// retried; when the last attempt fails its error is returned unchanged.
pub async fn retry_with_backoff<F, Fut, T, E>(policy: &RetryPolicy, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt: u32 = 0;

    loop {
        if attempt > 0 {
            debug!(attempt, max_retries = policy.max_retries, "Retry attempt");
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.max_retries {
                    if policy.max_retries > 0 {
                        error!(
                            max_retries = policy.max_retries,
                            error = %err,
                            "All retry attempts failed"
                        );
                    }
                    return Err(err);
                }

                let retry = RetryAttempt {
                    attempt,
                    delay: backoff_delay(
                        attempt,
                        policy.base_delay(),
                        policy.max_delay(),
                        &mut rand::rng(),
                    ),
                    error: err.to_string(),
                };
                warn!(
                    attempt = retry.attempt + 1,
                    delay_ms = retry.delay.as_millis() as u64,
                    error = %retry.error,
                    "Attempt failed, retrying"
                );

                metrics::counter!("gateway_retry_attempts_total").increment(1);
                tokio::time::sleep(retry.delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_exponential_delay_is_capped() {
        let base = Duration::from_secs(1);
        let cap = Duration::from_secs(30);

        assert_eq!(exponential_delay(0, base, cap), Duration::from_secs(1));
        assert_eq!(exponential_delay(3, base, cap), Duration::from_secs(8));
        assert_eq!(exponential_delay(5, base, cap), Duration::from_secs(30));
        // 2^40 overflows u32 and saturates to the cap
        assert_eq!(exponential_delay(40, base, cap), cap);
    }

    #[test]
    fn test_backoff_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        let base = Duration::from_millis(100);
        let cap = Duration::from_secs(10);

        for attempt in 0..8 {
            let raw = exponential_delay(attempt, base, cap).as_secs_f64();
            for _ in 0..50 {
                let delay = backoff_delay(attempt, base, cap, &mut rng).as_secs_f64();
                assert!(delay >= raw * (1.0 - JITTER_RATIO) - 1e-9);
                assert!(delay <= raw * (1.0 + JITTER_RATIO) + 1e-9);
            }
        }
    }

    #[test]
    fn test_backoff_deterministic_with_seed() {
        let base = Duration::from_millis(250);
        let cap = Duration::from_secs(5);

        let mut first = StdRng::seed_from_u64(7);
        let mut second = StdRng::seed_from_u64(7);
        let a: Vec<Duration> = (0..5).map(|n| backoff_delay(n, base, cap, &mut first)).collect();
        let b: Vec<Duration> = (0..5).map(|n| backoff_delay(n, base, cap, &mut second)).collect();

        assert_eq!(a, b);
    }

    #[test]
    fn test_backoff_zero_base() {
        let mut rng = StdRng::seed_from_u64(1);
        let delay = backoff_delay(3, Duration::ZERO, Duration::ZERO, &mut rng);
        assert_eq!(delay, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(3);

        let result: Result<&str, String> = retry_with_backoff(&policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            if n < 2 {
                Err(format!("transient failure {n}"))
            } else {
                Ok("done")
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_returns_original_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::immediate(2);

        let result: GatewayResult<()> = retry_with_backoff(&policy, || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Err(GatewayError::BrokerConnection(format!("attempt {n}")))
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        match result {
            Err(GatewayError::BrokerConnection(msg)) => assert_eq!(msg, "attempt 2"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_zero_retries_runs_once() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = retry_with_backoff(&RetryPolicy::immediate(0), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err("boom".to_string())
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_sleeps_between_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(20), Duration::from_millis(40));
        let start = std::time::Instant::now();

        let _: Result<(), String> =
            retry_with_backoff(&policy, || async { Err("always".to_string()) }).await;

        // 20ms + 40ms, minus 10% jitter on each
        assert!(start.elapsed() >= Duration::from_millis(54));
    }

    #[test]
    fn test_policy_validation() {
        assert!(RetryPolicy::default().validate().is_ok());
        let invalid = RetryPolicy::new(1, Duration::from_secs(5), Duration::from_secs(1));
        assert!(invalid.validate().is_err());
    }
}
