pub mod cache;
pub mod message_queue;
pub mod repository;

pub use cache::*;
pub use message_queue::*;
pub use repository::*;
