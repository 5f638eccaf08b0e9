//! Background task consuming vehicle registration events.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::bus::{MessageBus, Subscription};
use crate::config::ConsumerConfig;
use crate::consumer::NotificationProcessor;

/// Why draining a subscription stopped.
enum Drained {
    Cancelled,
    Lost,
}

/// Consumes the notification queue until cancelled.
///
/// Each delivery is processed and settled before the next is pulled. When
/// the subscription fails or ends the worker waits `reconnect_delay` and
/// subscribes again.
pub struct NotificationWorker {
    bus: Arc<dyn MessageBus>,
    processor: Arc<NotificationProcessor>,
    reconnect_delay: Duration,
    consumer_tag: String,
}

impl NotificationWorker {
    /// Spawn the worker on the current `tokio` runtime.
    ///
    /// The returned handle completes after `shutdown` is cancelled.
    pub fn spawn(
        bus: Arc<dyn MessageBus>,
        processor: Arc<NotificationProcessor>,
        config: &ConsumerConfig,
        shutdown: CancellationToken,
    ) -> JoinHandle<()> {
        let worker = Self {
            bus,
            processor,
            reconnect_delay: config.reconnect_delay,
            consumer_tag: format!("fleetlease-notifications-{}", uuid::Uuid::new_v4()),
        };
        tokio::spawn(worker.run(shutdown))
    }

    async fn run(self, shutdown: CancellationToken) {
        tracing::info!(consumer_tag = %self.consumer_tag, "notification worker started");

        loop {
            let subscribed = tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                result = self.bus.subscribe(&self.consumer_tag) => result,
            };

            match subscribed {
                Ok(mut subscription) => {
                    if let Drained::Cancelled = self.drain(subscription.as_mut(), &shutdown).await {
                        break;
                    }
                }
                Err(err) => {
                    tracing::warn!(error = %err, "subscribe failed");
                }
            }

            tracing::info!(
                delay_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "resubscribing after delay"
            );
            tokio::select! {
                biased;
                () = shutdown.cancelled() => break,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        tracing::info!(consumer_tag = %self.consumer_tag, "notification worker stopped");
    }

    async fn drain(
        &self,
        subscription: &mut dyn Subscription,
        shutdown: &CancellationToken,
    ) -> Drained {
        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => return Drained::Cancelled,
                next = subscription.next_delivery() => next,
            };

            let delivery = match next {
                Some(Ok(delivery)) => delivery,
                Some(Err(err)) => {
                    tracing::warn!(error = %err, "delivery failed");
                    return Drained::Lost;
                }
                None => {
                    tracing::warn!("subscription ended");
                    return Drained::Lost;
                }
            };

            let disposition = self.processor.process(delivery.payload());
            tracing::debug!(
                ?disposition,
                redelivered = delivery.redelivered(),
                "settling delivery"
            );
            if let Err(err) = delivery.settle(disposition).await {
                tracing::warn!(error = %err, "settlement failed");
                return Drained::Lost;
            }
        }
    }
}
