//! # Gateway Testing Utils
//!
//! Shared testing utilities for the notification gateway workspace.
//!
//! - **Mocks**: failure-injecting wrappers over the in-memory stores, cache
//!   and publisher, with call counters
//! - **Builders**: notification requests with sensible defaults
//! - **Helpers**: resilience settings without backoff delays
//!
//! ```toml
//! [dev-dependencies]
//! gateway-testing-utils = { path = "../testing-utils" }
//! ```

pub mod builders;
pub mod helpers;
pub mod mocks;

pub use builders::*;
pub use helpers::*;
pub use mocks::*;
