//! Error types for fleetlease.

use chrono::{DateTime, Utc};

use crate::driver::LicenseCategory;
use crate::ids::{AllocationExhausted, RentalId, VehicleId};

/// Result type for fleetlease operations.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Business-rule outcomes and failures returned by fleetlease operations.
///
/// Every variant is recoverable and meant to be mapped to a user-facing
/// status by the caller.
#[derive(Debug, thiserror::Error)]
pub enum FleetError {
    /// The requested plan length is not in the pricing table.
    #[error("invalid rental plan: {plan_days} days")]
    InvalidPlan {
        /// The rejected plan length.
        plan_days: u32,
    },

    /// A referenced record does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record (`vehicle`, `driver`, `rental`).
        entity: &'static str,
        /// The identifier that was looked up.
        id: String,
    },

    /// A unique business key is already registered.
    #[error("{field} already registered: {value}")]
    DuplicateKey {
        /// The unique field (`plate`, `tax_id`, `license_number`, `id`).
        field: &'static str,
        /// The conflicting value.
        value: String,
    },

    /// The driver's license category does not allow motorcycle rentals.
    #[error("license category {category} is not eligible for motorcycle rentals")]
    IneligibleDriver {
        /// The driver's category.
        category: LicenseCategory,
    },

    /// The vehicle has an open rental.
    #[error("vehicle {vehicle_id} has an open rental")]
    VehicleUnavailable {
        /// The rented vehicle.
        vehicle_id: VehicleId,
    },

    /// The rental has already been settled.
    #[error("rental {rental_id} was already returned on {returned_on}")]
    AlreadyReturned {
        /// The settled rental.
        rental_id: RentalId,
        /// The recorded return date.
        returned_on: DateTime<Utc>,
    },

    /// Id probing hit its bound without finding a free value.
    #[error(transparent)]
    AllocationExhausted(#[from] AllocationExhausted),

    /// License category outside {A, B, AB, A+B}.
    #[error("invalid license category: {0:?} (expected A, B, AB or A+B)")]
    InvalidLicenseCategory(String),

    /// License image reference with an unsupported format.
    #[error("invalid license image: {0}")]
    InvalidLicenseImage(String),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),
}

impl FleetError {
    /// Shorthand for [`FleetError::NotFound`].
    #[must_use]
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`FleetError::DuplicateKey`].
    #[must_use]
    pub fn duplicate(field: &'static str, value: impl Into<String>) -> Self {
        Self::DuplicateKey {
            field,
            value: value.into(),
        }
    }
}
