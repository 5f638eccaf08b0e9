//! In-process message bus.
//!
//! One queue receives every published message regardless of routing key.
//! Settlement follows broker semantics: `Requeue` puts the message back at
//! the tail marked as redelivered, `Reject` moves it to the dead letters.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::bus::{Delivery, Disposition, MessageBus, Subscription};
use crate::error::{EventError, Result};

/// A message held by the [`InMemoryBus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Routing key it was published with.
    pub routing_key: String,
    /// Message body.
    pub payload: Vec<u8>,
    /// Whether it was delivered and requeued before.
    pub redelivered: bool,
}

#[derive(Debug, Default)]
struct Shared {
    queue: Mutex<VecDeque<QueuedMessage>>,
    dead_letters: Mutex<Vec<QueuedMessage>>,
    acked: Mutex<Vec<QueuedMessage>>,
    available: Notify,
}

impl Shared {
    fn enqueue(&self, message: QueuedMessage) {
        lock(&self.queue).push_back(message);
        self.available.notify_one();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// An in-memory [`MessageBus`].
///
/// Cloning yields another handle to the same queue.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBus {
    shared: Arc<Shared>,
}

impl InMemoryBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages waiting for a consumer.
    #[must_use]
    pub fn pending(&self) -> Vec<QueuedMessage> {
        lock(&self.shared.queue).iter().cloned().collect()
    }

    /// Messages settled with [`Disposition::Ack`].
    #[must_use]
    pub fn acked(&self) -> Vec<QueuedMessage> {
        lock(&self.shared.acked).clone()
    }

    /// Messages settled with [`Disposition::Reject`].
    #[must_use]
    pub fn dead_letters(&self) -> Vec<QueuedMessage> {
        lock(&self.shared.dead_letters).clone()
    }
}

#[async_trait]
impl MessageBus for InMemoryBus {
    async fn publish(&self, routing_key: &str, payload: Vec<u8>) -> Result<()> {
        self.shared.enqueue(QueuedMessage {
            routing_key: routing_key.to_owned(),
            payload,
            redelivered: false,
        });
        Ok(())
    }

    async fn subscribe(&self, _consumer_tag: &str) -> Result<Box<dyn Subscription>> {
        Ok(Box::new(InMemorySubscription {
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct InMemorySubscription {
    shared: Arc<Shared>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next_delivery(&mut self) -> Option<Result<Box<dyn Delivery>>> {
        loop {
            let next = lock(&self.shared.queue).pop_front();
            if let Some(message) = next {
                return Some(Ok(Box::new(InMemoryDelivery {
                    message,
                    shared: Arc::clone(&self.shared),
                    settled: AtomicBool::new(false),
                })));
            }
            self.shared.available.notified().await;
        }
    }
}

struct InMemoryDelivery {
    message: QueuedMessage,
    shared: Arc<Shared>,
    settled: AtomicBool,
}

#[async_trait]
impl Delivery for InMemoryDelivery {
    fn payload(&self) -> &[u8] {
        &self.message.payload
    }

    fn redelivered(&self) -> bool {
        self.message.redelivered
    }

    async fn settle(&self, disposition: Disposition) -> Result<()> {
        if self.settled.swap(true, Ordering::SeqCst) {
            return Err(EventError::Broker("delivery already settled".into()));
        }

        let message = self.message.clone();
        match disposition {
            Disposition::Ack => lock(&self.shared.acked).push(message),
            Disposition::Requeue => self.shared.enqueue(QueuedMessage {
                redelivered: true,
                ..message
            }),
            Disposition::Reject => lock(&self.shared.dead_letters).push(message),
        }
        Ok(())
    }
}
