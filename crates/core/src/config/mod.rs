//! Gateway configuration models and loading
//!
//! Configuration is assembled from built-in defaults, an optional TOML file
//! and `GATEWAY_`-prefixed environment variables, in increasing priority.

pub mod models;

pub use models::{
    ApiConfig, AppConfig, CacheConfig, DatabaseConfig, MessageQueueConfig, ObservabilityConfig,
    QueueBinding, RateLimitConfig, ResilienceConfig,
};
