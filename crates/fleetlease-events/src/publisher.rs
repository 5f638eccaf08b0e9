//! Publishing of vehicle registration events.

use std::sync::Arc;

use fleetlease_core::VehicleRegistered;

use crate::bus::MessageBus;
use crate::error::Result;

/// Publishes [`VehicleRegistered`] events with a fixed routing key.
#[derive(Clone)]
pub struct VehicleEventPublisher {
    bus: Arc<dyn MessageBus>,
    routing_key: String,
}

impl VehicleEventPublisher {
    /// Creates a publisher for the given bus and routing key.
    pub fn new(bus: Arc<dyn MessageBus>, routing_key: impl Into<String>) -> Self {
        Self {
            bus,
            routing_key: routing_key.into(),
        }
    }

    /// The routing key events are published with.
    #[must_use]
    pub fn routing_key(&self) -> &str {
        &self.routing_key
    }

    /// Serialize `event` as JSON and publish it.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the broker rejects the
    /// message.
    pub async fn publish(&self, event: &VehicleRegistered) -> Result<()> {
        let payload = event.to_json()?;
        self.bus.publish(&self.routing_key, payload).await?;

        tracing::debug!(
            vehicle_id = %event.vehicle_id,
            routing_key = %self.routing_key,
            "vehicle registered event published"
        );
        Ok(())
    }
}
