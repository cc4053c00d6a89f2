//! Redis-backed implementation of [`gateway_core::CacheService`]

pub mod manager;

pub use manager::RedisCacheManager;
