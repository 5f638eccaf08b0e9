//! Vehicle registry records.

use serde::{Deserialize, Serialize};

use crate::ids::{normalize_plate, NaturalKey, VehicleId};

/// A registered vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vehicle {
    /// Identifier derived from the plate at registration time.
    pub id: VehicleId,

    /// Model year.
    pub model_year: i32,

    /// Model name.
    pub model: String,

    /// License plate (unique after normalization).
    pub plate: String,
}

impl Vehicle {
    /// Plate in the normalized form used for uniqueness.
    #[must_use]
    pub fn normalized_plate(&self) -> String {
        normalize_plate(&self.plate)
    }
}

/// Input for registering a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVehicle {
    /// Model year.
    pub model_year: i32,
    /// Model name.
    pub model: String,
    /// License plate.
    pub plate: String,
}

impl NewVehicle {
    /// Create a registration.
    #[must_use]
    pub fn new(model_year: i32, model: impl Into<String>, plate: impl Into<String>) -> Self {
        Self {
            model_year,
            model: model.into(),
            plate: plate.into(),
        }
    }

    /// The natural key the vehicle id is derived from.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::vehicle(&self.plate)
    }

    /// Turn the registration into a record with the allocated id.
    #[must_use]
    pub fn into_vehicle(self, id: VehicleId) -> Vehicle {
        Vehicle {
            id,
            model_year: self.model_year,
            model: self.model,
            plate: self.plate.trim().to_owned(),
        }
    }
}
