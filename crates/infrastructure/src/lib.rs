pub mod cache;
pub mod database;
pub mod error_handling;
pub mod in_memory;
pub mod message_queue;

pub use cache::RedisCacheManager;
pub use database::{DatabaseManager, PostgresIdempotencyRepository, PostgresNotificationRepository};
pub use in_memory::{
    InMemoryCache, InMemoryIdempotencyRepository, InMemoryNotificationRepository,
    InMemoryPublisher,
};
pub use message_queue::RabbitMQPublisher;
