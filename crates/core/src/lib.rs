pub mod breaker_registry;
pub mod circuit_breaker;
pub mod config;
pub mod errors;
pub mod logging;
pub mod models;
pub mod retry;
pub mod traits;

pub use breaker_registry::CircuitBreakerRegistry;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerSnapshot, CircuitState};
pub use config::AppConfig;
pub use errors::*;
pub use models::*;
pub use retry::{backoff_delay, retry_with_backoff, RetryAttempt, RetryPolicy};
pub use traits::*;
