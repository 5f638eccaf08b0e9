//! Domain events published on the message bus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::VehicleId;
use crate::vehicle::Vehicle;

/// Emitted once a vehicle registration has been committed.
///
/// Wire format is camelCase JSON:
/// `{vehicleId, modelYear, modelName, plate, registeredAt}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleRegistered {
    /// The registered vehicle.
    pub vehicle_id: VehicleId,
    /// Model year.
    pub model_year: i32,
    /// Model name.
    pub model_name: String,
    /// License plate.
    pub plate: String,
    /// When the registration was committed.
    pub registered_at: DateTime<Utc>,
}

impl VehicleRegistered {
    /// Build the event for a persisted vehicle.
    #[must_use]
    pub fn from_vehicle(vehicle: &Vehicle, registered_at: DateTime<Utc>) -> Self {
        Self {
            vehicle_id: vehicle.id,
            model_year: vehicle.model_year,
            model_name: vehicle.model.clone(),
            plate: vehicle.plate.clone(),
            registered_at,
        }
    }

    /// Encode as JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Decode from JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is not a valid event.
    pub fn from_json(payload: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn wire_format_is_camel_case() {
        let vehicle = Vehicle {
            id: VehicleId::new(12),
            model_year: 2024,
            model: "Sport 110i".into(),
            plate: "ABC1D23".into(),
        };
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let json: serde_json::Value =
            serde_json::from_slice(&VehicleRegistered::from_vehicle(&vehicle, at).to_json().unwrap())
                .unwrap();

        assert_eq!(json["vehicleId"], 12);
        assert_eq!(json["modelYear"], 2024);
        assert_eq!(json["modelName"], "Sport 110i");
        assert_eq!(json["plate"], "ABC1D23");
        assert!(json["registeredAt"].is_string());
    }

    #[test]
    fn garbage_does_not_decode() {
        assert!(VehicleRegistered::from_json(b"{not json").is_err());
        assert!(VehicleRegistered::from_json(br#"{"vehicleId": 1}"#).is_err());
    }
}
