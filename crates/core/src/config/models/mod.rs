pub mod api_observability;
pub mod app_config;
pub mod cache;
pub mod database;
pub mod message_queue;
pub mod resilience;

// Re-export main types for easier imports
pub use api_observability::{ApiConfig, ObservabilityConfig, RateLimitConfig};
pub use app_config::AppConfig;
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use message_queue::{MessageQueueConfig, QueueBinding};
pub use resilience::ResilienceConfig;
