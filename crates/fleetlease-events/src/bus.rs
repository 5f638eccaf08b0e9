//! Message bus abstraction.
//!
//! ```text
//! MessageBus ── publish(routing_key, payload)
//!     │
//!     └── subscribe(tag) ──▶ Subscription ── next_delivery() ──▶ Delivery
//!                                                                   │
//!                                        settle(Ack | Requeue | Reject)
//! ```

use async_trait::async_trait;

use crate::error::Result;

/// How a consumed message is settled with the broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processing finished; remove the message.
    Ack,
    /// Processing failed transiently; return the message to the queue.
    Requeue,
    /// The message can never be processed; drop it or dead-letter it.
    Reject,
}

/// A broker that can publish messages and hand out subscriptions.
#[async_trait]
pub trait MessageBus: Send + Sync {
    /// Publish a persistent message with the given routing key.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Broker` if the broker is unreachable or refuses
    /// the message.
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()>;

    /// Start consuming the configured queue with manual acknowledgement.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Broker` if the consumer cannot be registered.
    async fn subscribe(&self, consumer_tag: &str) -> Result<Box<dyn Subscription>>;
}

/// An active consumer.
#[async_trait]
pub trait Subscription: Send {
    /// Wait for the next message.
    ///
    /// Returns `None` when the subscription has ended and must be renewed.
    async fn next_delivery(&mut self) -> Option<Result<Box<dyn Delivery>>>;
}

/// A consumed message awaiting settlement.
#[async_trait]
pub trait Delivery: Send + Sync {
    /// The raw message body.
    fn payload(&self) -> &[u8];

    /// Whether the broker delivered this message before.
    fn redelivered(&self) -> bool;

    /// Settle the message.
    ///
    /// # Errors
    ///
    /// Returns `EventError::Broker` if the broker did not accept the
    /// settlement or the delivery was already settled.
    async fn settle(&self, disposition: Disposition) -> Result<()>;
}
