//! Storage layer for fleetlease.
//!
//! This crate provides persistence for vehicles, drivers, rentals and
//! notifications behind the [`Store`] trait, with two implementations:
//!
//! - [`MemoryStore`]: in-process tables, used in tests and when no data
//!   directory is configured
//! - `RocksStore` (feature `rocksdb-backend`): `RocksDB` with one column
//!   family per record type plus unique-key indexes
//!
//! # Uniqueness
//!
//! Callers may pre-check uniqueness (`plate_exists`, `tax_id_exists`, ...)
//! to reject early, but the authoritative check happens inside the insert
//! and update operations, atomically with the write. Two racing
//! registrations of the same plate therefore produce exactly one record and
//! one `StoreError::DuplicateKey`.
//!
//! # Example
//!
//! ```
//! use fleetlease_core::{NewVehicle, VehicleId};
//! use fleetlease_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let vehicle = NewVehicle::new(2024, "Sport 110i", "ABC1D23").into_vehicle(VehicleId::new(1));
//! store.insert_vehicle(&vehicle).unwrap();
//! assert!(store.plate_exists("abc1d23").unwrap());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;
#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use fleetlease_core::{
    Driver, DriverId, Notification, NotificationId, Rental, RentalId, Vehicle, VehicleId,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Vehicle Operations
    // =========================================================================

    /// Check whether a vehicle id is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn vehicle_exists(&self, id: VehicleId) -> Result<bool>;

    /// Check whether a plate is registered (compared normalized).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn plate_exists(&self, plate: &str) -> Result<bool>;

    /// Insert a new vehicle.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if the id or plate is taken.
    fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()>;

    /// Get a vehicle by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>>;

    /// List vehicles ordered by id, optionally keeping only plates that
    /// contain `plate_filter` (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_vehicles(&self, plate_filter: Option<&str>) -> Result<Vec<Vehicle>>;

    /// Change a vehicle's plate and return the updated record.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the vehicle doesn't exist.
    /// - `StoreError::DuplicateKey` if another vehicle has the plate.
    fn update_vehicle_plate(&self, id: VehicleId, plate: &str) -> Result<Vehicle>;

    /// Delete a vehicle.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the vehicle doesn't exist.
    /// - `StoreError::VehicleRented` if it has an open rental.
    fn delete_vehicle(&self, id: VehicleId) -> Result<()>;

    // =========================================================================
    // Driver Operations
    // =========================================================================

    /// Check whether a driver id is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn driver_exists(&self, id: DriverId) -> Result<bool>;

    /// Check whether a tax ID is registered (compared normalized).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn tax_id_exists(&self, tax_id: &str) -> Result<bool>;

    /// Check whether a license number is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn license_number_exists(&self, license_number: &str) -> Result<bool>;

    /// Insert a new driver.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if the id, tax ID or license
    /// number is taken.
    fn insert_driver(&self, driver: &Driver) -> Result<()>;

    /// Get a driver by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_driver(&self, id: DriverId) -> Result<Option<Driver>>;

    /// Record the license image reference and return the updated driver.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the driver doesn't exist.
    fn set_license_image(&self, id: DriverId, reference: &str) -> Result<Driver>;

    // =========================================================================
    // Rental Operations
    // =========================================================================

    /// Check whether a rental id is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn rental_exists(&self, id: RentalId) -> Result<bool>;

    /// Check whether the vehicle has a rental with no actual end date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_open_rental(&self, vehicle_id: VehicleId) -> Result<bool>;

    /// Insert a new open rental.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateKey` if the id is taken.
    /// - `StoreError::VehicleRented` if the vehicle already has an open rental.
    fn insert_rental(&self, rental: &Rental) -> Result<()>;

    /// Get a rental by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_rental(&self, id: RentalId) -> Result<Option<Rental>>;

    /// List all rentals ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_rentals(&self) -> Result<Vec<Rental>>;

    /// Persist a settled rental, releasing its vehicle.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the rental doesn't exist.
    /// - `StoreError::AlreadyReturned` if the stored rental is already closed.
    fn settle_rental(&self, rental: &Rental) -> Result<()>;

    // =========================================================================
    // Notification Operations
    // =========================================================================

    /// Check whether a notification id is taken.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn notification_exists(&self, id: NotificationId) -> Result<bool>;

    /// Insert a notification.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::DuplicateKey` if the id is taken.
    fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// List notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_notifications(&self) -> Result<Vec<Notification>>;
}
