//! Domain models for notifications and idempotency records.

pub mod idempotency;
pub mod notification;

pub use idempotency::*;
pub use notification::*;
