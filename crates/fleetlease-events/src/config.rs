//! Broker topology and consumer settings.

use std::time::Duration;

/// Exchange, queue and binding used for vehicle registration events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Durable topic exchange (default: `fleet_exchange`).
    pub exchange: String,

    /// Durable queue consumed by the notification worker
    /// (default: `vehicle_registered_queue`).
    pub queue: String,

    /// Routing key binding the queue to the exchange
    /// (default: `vehicle.registered`).
    pub routing_key: String,

    /// Exchange receiving rejected messages, if any.
    pub dead_letter_exchange: Option<String>,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            exchange: "fleet_exchange".into(),
            queue: "vehicle_registered_queue".into(),
            routing_key: "vehicle.registered".into(),
            dead_letter_exchange: None,
        }
    }
}

/// Settings for the notification consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    /// Model year that triggers a notification (default: 2024).
    pub trigger_model_year: i32,

    /// Reject a message after this many failed processing attempts.
    /// `None` requeues indefinitely.
    pub max_delivery_attempts: Option<u32>,

    /// Pause before resubscribing after the subscription is lost
    /// (default: 5 seconds).
    pub reconnect_delay: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            trigger_model_year: 2024,
            max_delivery_attempts: None,
            reconnect_delay: Duration::from_secs(5),
        }
    }
}
