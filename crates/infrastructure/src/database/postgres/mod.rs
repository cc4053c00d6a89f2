pub mod postgres_idempotency_repository;
pub mod postgres_notification_repository;

pub use postgres_idempotency_repository::PostgresIdempotencyRepository;
pub use postgres_notification_repository::PostgresNotificationRepository;
