//! Notifications generated from vehicle registration events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::VehicleRegistered;
use crate::ids::{NaturalKey, NotificationId, VehicleId};

/// A notification about a registered vehicle of the trigger model year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// Identifier derived from processing instant and vehicle.
    pub id: NotificationId,
    /// The registered vehicle.
    pub vehicle_id: VehicleId,
    /// The vehicle's model year.
    pub model_year: i32,
    /// Human-readable message.
    pub message: String,
    /// When the notification was created.
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// The natural key of a notification created at `processed_at` for `event`.
    #[must_use]
    pub fn natural_key(event: &VehicleRegistered, processed_at: DateTime<Utc>) -> NaturalKey {
        NaturalKey::notification(processed_at, event.vehicle_id)
    }

    /// Build the notification for `event`.
    #[must_use]
    pub fn for_registration(
        id: NotificationId,
        event: &VehicleRegistered,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            vehicle_id: event.vehicle_id,
            model_year: event.model_year,
            message: format!(
                "Vehicle {} (plate {}) from {} was registered.",
                event.model_name, event.plate, event.model_year
            ),
            created_at,
        }
    }
}
