use std::time::{Duration, Instant};

use gateway_core::config::RateLimitConfig;
use parking_lot::Mutex;

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

/// 令牌桶限流器
///
/// 容量为 `burst_size`，按 `max_requests_per_minute` 匀速补充。
#[derive(Debug)]
pub struct RateLimiter {
    capacity: f64,
    refill_per_second: f64,
    bucket: Mutex<Bucket>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let capacity = f64::from(config.burst_size.max(1));
        Self {
            capacity,
            refill_per_second: f64::from(config.max_requests_per_minute.max(1)) / 60.0,
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    /// 取一个令牌；桶空时返回下一个令牌可用前的等待时间
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let mut bucket = self.bucket.lock();
        let now = Instant::now();
        let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.refill_per_second).min(self.capacity);
        bucket.last_refill = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            let missing = 1.0 - bucket.tokens;
            Err(Duration::from_secs_f64(missing / self.refill_per_second))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_requests_per_minute: u32, burst_size: u32) -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            max_requests_per_minute,
            burst_size,
        }
    }

    #[test]
    fn test_burst_then_rejected() {
        let limiter = RateLimiter::new(&config(60, 3));

        for _ in 0..3 {
            assert!(limiter.try_acquire().is_ok());
        }
        let retry_after = limiter.try_acquire().unwrap_err();
        // One token per second at 60/min
        assert!(retry_after <= Duration::from_secs(1));
        assert!(retry_after > Duration::ZERO);
    }

    #[test]
    fn test_tokens_refill_over_time() {
        // 6000/min refills a token every 10ms
        let limiter = RateLimiter::new(&config(6000, 1));
        assert!(limiter.try_acquire().is_ok());
        assert!(limiter.try_acquire().is_err());

        std::thread::sleep(Duration::from_millis(30));
        assert!(limiter.try_acquire().is_ok());
    }
}
