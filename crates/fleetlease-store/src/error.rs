//! Error types for fleetlease storage.

use chrono::{DateTime, Utc};
use fleetlease_core::{FleetError, RentalId, VehicleId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A unique key is already taken (checked atomically with the write).
    #[error("{field} already registered: {value}")]
    DuplicateKey {
        /// The unique field.
        field: &'static str,
        /// The conflicting value.
        value: String,
    },

    /// The vehicle has an open rental.
    #[error("vehicle {vehicle_id} has an open rental")]
    VehicleRented {
        /// The rented vehicle.
        vehicle_id: VehicleId,
    },

    /// The stored rental is already settled.
    #[error("rental {rental_id} was already returned on {returned_on}")]
    AlreadyReturned {
        /// The settled rental.
        rental_id: RentalId,
        /// The recorded return date.
        returned_on: DateTime<Utc>,
    },
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn duplicate(field: &'static str, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field,
            value: value.into(),
        }
    }
}

impl From<StoreError> for FleetError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => Self::NotFound { entity, id },
            StoreError::DuplicateKey { field, value } => Self::DuplicateKey { field, value },
            StoreError::VehicleRented { vehicle_id } => Self::VehicleUnavailable { vehicle_id },
            StoreError::AlreadyReturned {
                rental_id,
                returned_on,
            } => Self::AlreadyReturned {
                rental_id,
                returned_on,
            },
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Storage(msg),
        }
    }
}
