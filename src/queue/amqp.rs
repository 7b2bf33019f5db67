use async_trait::async_trait;
use futures::StreamExt;
use lapin::{
    BasicProperties, Channel, Connection, ConnectionProperties, Consumer, ExchangeKind,
    options::*, types::FieldTable,
};
use uuid::Uuid;

use super::{QueueMessage, VoteProducer, VoteSubscriber};
use crate::error::QueueError;

const PERSISTENT: u8 = 2;
const PREFETCH: u16 = 64;

/// Declare the durable fanout exchange that stands for a topic.
async fn declare_topic(channel: &Channel, topic: &str) -> Result<(), QueueError> {
    channel
        .exchange_declare(
            topic,
            ExchangeKind::Fanout,
            ExchangeDeclareOptions {
                durable: true,
                ..ExchangeDeclareOptions::default()
            },
            FieldTable::default(),
        )
        .await?;
    Ok(())
}

/// Publishes vote payloads to the topic exchange.
pub struct AmqpProducer {
    connection: Connection,
    channel: Channel,
    topic: String,
}

impl AmqpProducer {
    pub async fn connect(amqp_url: &str, topic: &str) -> Result<Self, QueueError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        declare_topic(&channel, topic).await?;

        info!(topic, "connected to broker for publishing");

        Ok(Self {
            connection,
            channel,
            topic: topic.to_string(),
        })
    }
}

#[async_trait]
impl VoteProducer for AmqpProducer {
    async fn publish(&self, payload: &[u8]) -> Result<(), QueueError> {
        if !self.channel.status().connected() {
            return Err(QueueError::Closed);
        }
        // The returned confirmation is dropped: delivery guarantees past this
        // point belong to the broker.
        let _confirm = self
            .channel
            .basic_publish(
                &self.topic,
                "",
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_delivery_mode(PERSISTENT),
            )
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), QueueError> {
        self.channel.close(200, "publisher stopped").await?;
        self.connection.close(200, "publisher stopped").await?;
        Ok(())
    }
}

/// A consumer-group subscription: queue `<topic>.<group>` bound to the topic.
pub struct AmqpSubscriber {
    connection: Connection,
    channel: Channel,
    consumer: Consumer,
    consumer_tag: String,
}

impl AmqpSubscriber {
    pub async fn connect(amqp_url: &str, topic: &str, group: &str) -> Result<Self, QueueError> {
        let connection = Connection::connect(amqp_url, ConnectionProperties::default()).await?;
        let channel = connection.create_channel().await?;
        declare_topic(&channel, topic).await?;

        let queue_name = format!("{topic}.{group}");
        channel
            .queue_declare(
                &queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;
        channel
            .queue_bind(
                &queue_name,
                topic,
                "",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;
        channel
            .basic_qos(PREFETCH, BasicQosOptions::default())
            .await?;

        let consumer_tag = format!("{group}-{}", Uuid::new_v4());
        let consumer = channel
            .basic_consume(
                &queue_name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        info!(queue = %queue_name, consumer_tag = %consumer_tag, "subscribed to votes");

        Ok(Self {
            connection,
            channel,
            consumer,
            consumer_tag,
        })
    }
}

#[async_trait]
impl VoteSubscriber for AmqpSubscriber {
    async fn recv(&mut self) -> Option<Result<QueueMessage, QueueError>> {
        let delivery = self.consumer.next().await?;
        Some(
            delivery
                .map(|d| QueueMessage::new(d.data, d.acker))
                .map_err(QueueError::from),
        )
    }

    async fn stop(&mut self) -> Result<(), QueueError> {
        self.channel
            .basic_cancel(&self.consumer_tag, BasicCancelOptions::default())
            .await?;
        // Unacked deliveries still in the prefetch buffer go back to the queue.
        self.channel.close(200, "consumer stopped").await?;
        self.connection.close(200, "consumer stopped").await?;
        Ok(())
    }
}
