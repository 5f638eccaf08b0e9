//! Core types and business rules for fleetlease.
//!
//! This crate provides the foundational pieces of the fleet-leasing platform:
//!
//! - **Identifiers**: `VehicleId`, `DriverId`, `RentalId`, `NotificationId`
//!   and the deterministic [`IdAllocator`]
//! - **Registry records**: `Vehicle`, `Driver`, `LicenseCategory`
//! - **Rentals**: `Rental`, `RentalDraft`, `Settlement`
//! - **Pricing**: `RentalPricing`, `PlanTerms`
//! - **Events**: `VehicleRegistered`, `Notification`
//!
//! # Identity
//!
//! Primary keys are derived from natural business keys (license plate,
//! tax ID, creation instant) rather than generated at random, so the same
//! registration always maps to the same id unless it collides with an
//! existing record, in which case the next free value is taken.
//!
//! # Money
//!
//! All monetary values are `rust_decimal::Decimal`, never floating point.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod driver;
pub mod error;
pub mod event;
pub mod ids;
pub mod notification;
pub mod pricing;
pub mod rental;
pub mod vehicle;

pub use driver::{license_image_reference, Driver, LicenseCategory, NewDriver};
pub use error::{FleetError, Result};
pub use event::VehicleRegistered;
pub use ids::{
    AllocationExhausted, DriverId, EntityId, IdAllocator, IdError, NaturalKey, NotificationId,
    RentalId, VehicleId, DEFAULT_MAX_PROBES,
};
pub use notification::Notification;
pub use pricing::{PlanTerms, RentalPricing, RentalQuote, DEFAULT_LATE_FEE_PER_DAY};
pub use rental::{
    open_rental, OpenRentalRequest, Rental, RentalDraft, RentalEligibility, ReturnOutcome,
    Settlement,
};
pub use vehicle::{NewVehicle, Vehicle};
