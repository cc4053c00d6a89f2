use std::time::Duration;

use async_trait::async_trait;
use gateway_core::config::MessageQueueConfig;
use gateway_core::{GatewayError, GatewayResult, MessagePublisher};
use lapin::{
    options::*, types::FieldTable, BasicProperties, Channel, Connection, ConnectionProperties,
    ExchangeKind,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

type Session = (Connection, Channel);

/// RabbitMQ 发布端
///
/// 连接在首次发布时建立。每次发布在连接锁内完成检查、发布和等待确认，
/// 同一通道上的确认不会交错；连接级错误会关闭并丢弃缓存的连接，下一次发布重新建立。
pub struct RabbitMQPublisher {
    config: MessageQueueConfig,
    state: Mutex<Option<Session>>,
}

impl RabbitMQPublisher {
    pub fn new(config: MessageQueueConfig) -> Self {
        Self {
            config,
            state: Mutex::new(None),
        }
    }

    /// 建立连接并立即声明拓扑
    pub async fn connect(config: MessageQueueConfig) -> GatewayResult<Self> {
        let publisher = Self::new(config);
        publisher.reconnect().await?;
        Ok(publisher)
    }

    async fn open(&self) -> GatewayResult<Session> {
        let timeout = Duration::from_secs(self.config.connection_timeout_seconds);
        let connection = tokio::time::timeout(
            timeout,
            Connection::connect(&self.config.url, ConnectionProperties::default()),
        )
        .await
        .map_err(|_| GatewayError::BrokerConnection(format!("连接RabbitMQ超时 ({timeout:?})")))?
        .map_err(|e| GatewayError::BrokerConnection(format!("连接RabbitMQ失败: {e}")))?;

        let channel = connection
            .create_channel()
            .await
            .map_err(|e| GatewayError::BrokerConnection(format!("创建通道失败: {e}")))?;

        if self.config.publisher_confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await
                .map_err(|e| GatewayError::BrokerConnection(format!("开启发布确认失败: {e}")))?;
        }

        self.declare_topology(&channel).await?;
        info!(exchange = %self.config.exchange, "成功连接到RabbitMQ");
        Ok((connection, channel))
    }

    /// 声明交换机、队列及绑定关系
    async fn declare_topology(&self, channel: &Channel) -> GatewayResult<()> {
        channel
            .exchange_declare(
                &self.config.exchange,
                ExchangeKind::Direct,
                ExchangeDeclareOptions {
                    durable: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| {
                GatewayError::BrokerConnection(format!(
                    "声明交换机 {} 失败: {e}",
                    self.config.exchange
                ))
            })?;

        for binding in &self.config.queues {
            channel
                .queue_declare(
                    &binding.queue,
                    QueueDeclareOptions {
                        durable: true,
                        exclusive: false,
                        auto_delete: false,
                        ..Default::default()
                    },
                    FieldTable::default(),
                )
                .await
                .map_err(|e| {
                    GatewayError::BrokerConnection(format!("声明队列 {} 失败: {e}", binding.queue))
                })?;

            if let Some(routing_key) = &binding.routing_key {
                channel
                    .queue_bind(
                        &binding.queue,
                        &self.config.exchange,
                        routing_key,
                        QueueBindOptions::default(),
                        FieldTable::default(),
                    )
                    .await
                    .map_err(|e| {
                        GatewayError::BrokerConnection(format!(
                            "绑定队列 {} 失败: {e}",
                            binding.queue
                        ))
                    })?;
            }
            debug!(queue = %binding.queue, "队列声明成功");
        }

        Ok(())
    }

    /// 发布一条消息并等待确认，调用方持有连接锁
    async fn send(&self, channel: &Channel, routing_key: &str, payload: &[u8]) -> GatewayResult<()> {
        let confirm = channel
            .basic_publish(
                &self.config.exchange,
                routing_key,
                BasicPublishOptions {
                    mandatory: true,
                    ..Default::default()
                },
                payload,
                BasicProperties::default()
                    .with_delivery_mode(2)
                    .with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| {
                GatewayError::BrokerConnection(format!("发布消息到 {routing_key} 失败: {e}"))
            })?;

        let confirmation = confirm
            .await
            .map_err(|e| GatewayError::BrokerConnection(format!("消息发布确认失败: {e}")))?;

        if confirmation.is_nack() {
            return Err(GatewayError::MessageQueue(format!(
                "RabbitMQ拒绝了发往 {routing_key} 的消息"
            )));
        }
        if confirmation.take_message().is_some() {
            return Err(GatewayError::MessageQueue(format!(
                "路由键 {routing_key} 没有绑定队列"
            )));
        }
        Ok(())
    }
}

fn is_usable((connection, channel): &Session) -> bool {
    connection.status().connected() && channel.status().connected()
}

/// 尽力关闭已失效的连接
async fn discard(connection: Connection, reason: &str) {
    if let Err(e) = connection.close(200, reason).await {
        debug!(error = %e, "关闭失效的RabbitMQ连接失败");
    }
}

#[async_trait]
impl MessagePublisher for RabbitMQPublisher {
    async fn publish(&self, routing_key: &str, payload: &[u8]) -> GatewayResult<()> {
        let mut state = self.state.lock().await;

        let session = match state.take() {
            Some(session) if is_usable(&session) => session,
            stale => {
                if let Some((connection, _)) = stale {
                    warn!("RabbitMQ连接已失效，重新连接");
                    discard(connection, "stale").await;
                }
                self.open().await?
            }
        };

        let result = self.send(&session.1, routing_key, payload).await;
        match result {
            Err(e @ GatewayError::BrokerConnection(_)) => {
                warn!(routing_key, error = %e, "发布失败，丢弃RabbitMQ连接");
                discard(session.0, "publish failed").await;
                Err(e)
            }
            result => {
                *state = Some(session);
                if result.is_ok() {
                    debug!(routing_key, "消息已发布");
                }
                result
            }
        }
    }

    async fn is_connected(&self) -> bool {
        match self.state.lock().await.as_ref() {
            Some((connection, _)) => connection.status().connected(),
            None => false,
        }
    }

    async fn reconnect(&self) -> GatewayResult<()> {
        let mut state = self.state.lock().await;
        if let Some((connection, _)) = state.take() {
            discard(connection, "reconnect").await;
        }
        *state = Some(self.open().await?);
        Ok(())
    }

    async fn close(&self) -> GatewayResult<()> {
        if let Some((connection, _)) = self.state.lock().await.take() {
            connection
                .close(200, "正常关闭")
                .await
                .map_err(|e| GatewayError::BrokerConnection(format!("关闭连接失败: {e}")))?;
            info!("RabbitMQ连接已关闭");
        }
        Ok(())
    }
}
