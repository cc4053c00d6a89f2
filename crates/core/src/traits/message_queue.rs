use async_trait::async_trait;

use crate::errors::GatewayResult;

/// Outbound side of the message broker
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish a persistent message to the notification exchange.
    ///
    /// Connection-level failures are reported as `BrokerConnection`; a
    /// message the broker refused is reported as `MessageQueue`.
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> GatewayResult<()>;

    /// Whether a live connection is currently held
    async fn is_connected(&self) -> bool;

    /// Drop any cached connection and connect again
    async fn reconnect(&self) -> GatewayResult<()>;

    /// Close the connection, if any
    async fn close(&self) -> GatewayResult<()>;
}
