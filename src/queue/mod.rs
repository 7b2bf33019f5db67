//! Durable queue boundary between ingestion and aggregation.
//!
//! The pipeline only talks to the [`VoteProducer`] and [`VoteSubscriber`]
//! traits; [`amqp`] binds them to RabbitMQ.

pub mod amqp;

use async_trait::async_trait;
use lapin::acker::Acker;
use lapin::options::BasicAckOptions;

use crate::error::QueueError;

pub use amqp::{AmqpProducer, AmqpSubscriber};

#[async_trait]
pub trait VoteProducer: Send + Sync {
    /// Hand one payload to the broker without waiting for its confirmation.
    async fn publish(&self, payload: &[u8]) -> Result<(), QueueError>;

    /// Release the producer. Called once, after the last publish.
    async fn close(&self) -> Result<(), QueueError>;
}

#[async_trait]
pub trait VoteSubscriber: Send {
    /// Next delivered message, or `None` once the subscription has ended.
    async fn recv(&mut self) -> Option<Result<QueueMessage, QueueError>>;

    /// Stop receiving. Returns once the broker has confirmed no further
    /// deliveries will be made.
    async fn stop(&mut self) -> Result<(), QueueError>;
}

/// A delivered message. Ack it after it has been handled.
pub struct QueueMessage {
    body: Vec<u8>,
    acker: Option<Acker>,
}

impl QueueMessage {
    pub fn new(body: Vec<u8>, acker: Acker) -> Self {
        Self {
            body,
            acker: Some(acker),
        }
    }

    /// A message that needs no acknowledgement (in-process transports).
    pub fn unacked(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            acker: None,
        }
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub async fn ack(self) -> Result<(), QueueError> {
        if let Some(acker) = self.acker {
            acker.ack(BasicAckOptions::default()).await?;
        }
        Ok(())
    }
}
