//! Fleet operations.
//!
//! [`FleetService`] is the caller-facing surface: it allocates ids, runs
//! the rental rules from `fleetlease_core` and persists through the
//! [`Store`]. Uniqueness and availability pre-checks here only reject early;
//! the store re-checks them atomically with the write.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use fleetlease_core::ids::{normalize_plate, normalize_tax_id};
use fleetlease_core::{
    license_image_reference, open_rental, Driver, DriverId, FleetError, IdAllocator, NewDriver,
    NewVehicle, Notification, OpenRentalRequest, Rental, RentalEligibility, RentalId,
    RentalPricing, RentalQuote, Result, Settlement, Vehicle, VehicleId, VehicleRegistered,
};
use fleetlease_events::VehicleEventPublisher;
use fleetlease_store::Store;

/// Registrations, rentals and settlements.
#[derive(Clone)]
pub struct FleetService {
    store: Arc<dyn Store>,
    publisher: VehicleEventPublisher,
    allocator: IdAllocator,
    pricing: RentalPricing,
}

impl FleetService {
    /// Create a service over `store`, publishing through `publisher`.
    pub fn new(
        store: Arc<dyn Store>,
        publisher: VehicleEventPublisher,
        allocator: IdAllocator,
        pricing: RentalPricing,
    ) -> Self {
        Self {
            store,
            publisher,
            allocator,
            pricing,
        }
    }

    /// The plan table in use.
    #[must_use]
    pub fn pricing(&self) -> &RentalPricing {
        &self.pricing
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    /// Register a vehicle and publish its registration event.
    ///
    /// A failed publish is logged and does not undo the registration.
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` if the plate is taken.
    /// - `AllocationExhausted` if no id is free.
    pub async fn register_vehicle(&self, input: NewVehicle) -> Result<Vehicle> {
        self.register_vehicle_at(input, Utc::now()).await
    }

    /// Register a vehicle with an explicit registration instant.
    ///
    /// # Errors
    ///
    /// Same as [`register_vehicle`](Self::register_vehicle).
    pub async fn register_vehicle_at(
        &self,
        input: NewVehicle,
        registered_at: DateTime<Utc>,
    ) -> Result<Vehicle> {
        if self.store.plate_exists(&input.plate)? {
            return Err(FleetError::duplicate("plate", normalize_plate(&input.plate)));
        }

        let id = self.allocator.allocate(&input.natural_key(), |id| {
            Ok::<_, FleetError>(self.store.vehicle_exists(id)?)
        })?;
        let vehicle = input.into_vehicle(id);
        self.store.insert_vehicle(&vehicle)?;

        tracing::info!(
            vehicle_id = %vehicle.id,
            plate = %vehicle.plate,
            model_year = vehicle.model_year,
            "vehicle registered"
        );

        let event = VehicleRegistered::from_vehicle(&vehicle, registered_at);
        if let Err(err) = self.publisher.publish(&event).await {
            tracing::warn!(
                error = %err,
                vehicle_id = %vehicle.id,
                "vehicle registered but event was not published"
            );
        }

        Ok(vehicle)
    }

    /// Fetch a vehicle.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the vehicle doesn't exist.
    pub fn get_vehicle(&self, id: VehicleId) -> Result<Vehicle> {
        self.store
            .get_vehicle(id)?
            .ok_or_else(|| FleetError::not_found("vehicle", id))
    }

    /// List vehicles, optionally filtered by a plate substring.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub fn list_vehicles(&self, plate_filter: Option<&str>) -> Result<Vec<Vehicle>> {
        Ok(self.store.list_vehicles(plate_filter)?)
    }

    /// Change a vehicle's plate. The id is kept.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the vehicle doesn't exist.
    /// - `DuplicateKey` if another vehicle has the plate.
    pub fn update_vehicle_plate(&self, id: VehicleId, plate: &str) -> Result<Vehicle> {
        let vehicle = self.store.update_vehicle_plate(id, plate)?;
        tracing::info!(vehicle_id = %id, plate = %vehicle.plate, "vehicle plate updated");
        Ok(vehicle)
    }

    /// Delete a vehicle that is not rented.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the vehicle doesn't exist.
    /// - `VehicleUnavailable` while it has an open rental.
    pub fn delete_vehicle(&self, id: VehicleId) -> Result<()> {
        self.store.delete_vehicle(id)?;
        tracing::info!(vehicle_id = %id, "vehicle deleted");
        Ok(())
    }

    // =========================================================================
    // Drivers
    // =========================================================================

    /// Register a driver.
    ///
    /// # Errors
    ///
    /// - `DuplicateKey` if the tax ID or license number is taken.
    /// - `AllocationExhausted` if no id is free.
    pub fn register_driver(&self, input: NewDriver) -> Result<Driver> {
        if self.store.tax_id_exists(&input.tax_id)? {
            return Err(FleetError::duplicate("tax_id", normalize_tax_id(&input.tax_id)));
        }
        if self.store.license_number_exists(&input.license_number)? {
            return Err(FleetError::duplicate(
                "license_number",
                input.license_number.trim(),
            ));
        }

        let id = self.allocator.allocate(&input.natural_key(), |id| {
            Ok::<_, FleetError>(self.store.driver_exists(id)?)
        })?;
        let driver = input.into_driver(id);
        self.store.insert_driver(&driver)?;

        tracing::info!(
            driver_id = %driver.id,
            category = %driver.license_category,
            "driver registered"
        );
        Ok(driver)
    }

    /// Fetch a driver.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the driver doesn't exist.
    pub fn get_driver(&self, id: DriverId) -> Result<Driver> {
        self.store
            .get_driver(id)?
            .ok_or_else(|| FleetError::not_found("driver", id))
    }

    /// Record the license image uploaded as `file_name`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the driver doesn't exist.
    /// - `IneligibleDriver` unless the category allows motorcycles.
    /// - `InvalidLicenseImage` unless the file is a `.png` or `.bmp`.
    pub fn attach_license_image(&self, id: DriverId, file_name: &str) -> Result<Driver> {
        let driver = self.get_driver(id)?;
        if !driver.license_category.can_rent_motorcycles() {
            return Err(FleetError::IneligibleDriver {
                category: driver.license_category,
            });
        }

        let reference = license_image_reference(id, file_name)?;
        let driver = self.store.set_license_image(id, &reference)?;
        tracing::info!(driver_id = %id, reference = %reference, "license image attached");
        Ok(driver)
    }

    // =========================================================================
    // Rentals
    // =========================================================================

    /// Price a plan starting the day after `now`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPlan` for a length outside the table.
    pub fn quote(&self, plan_days: u32, now: DateTime<Utc>) -> Result<RentalQuote> {
        self.pricing.quote(plan_days, now)
    }

    /// Open a rental.
    ///
    /// # Errors
    ///
    /// In order of precedence: `InvalidPlan`, `NotFound` (vehicle, then
    /// driver), `IneligibleDriver`, `VehicleUnavailable`. Also
    /// `AllocationExhausted` if no id is free.
    pub fn open_rental(&self, request: OpenRentalRequest) -> Result<Rental> {
        let eligibility = RentalEligibility {
            vehicle_exists: self.store.vehicle_exists(request.vehicle_id)?,
            driver_category: self
                .store
                .get_driver(request.driver_id)?
                .map(|d| d.license_category),
            vehicle_has_open_rental: self.store.has_open_rental(request.vehicle_id)?,
        };
        let draft = open_rental(&request, &eligibility, &self.pricing)?;

        let id = self.allocator.allocate(&draft.natural_key(), |id| {
            Ok::<_, FleetError>(self.store.rental_exists(id)?)
        })?;
        let rental = draft.into_rental(id);
        self.store.insert_rental(&rental)?;

        tracing::info!(
            rental_id = %rental.id,
            vehicle_id = %rental.vehicle_id,
            driver_id = %rental.driver_id,
            plan_days = rental.plan_days,
            total_value = %rental.total_value,
            "rental opened"
        );
        Ok(rental)
    }

    /// Return a rental at `actual_end` and persist the settlement.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the rental doesn't exist.
    /// - `AlreadyReturned` if it was settled before.
    pub fn close_rental(&self, id: RentalId, actual_end: DateTime<Utc>) -> Result<Settlement> {
        let mut rental = self.get_rental(id)?;
        let settlement = rental.close(actual_end, &self.pricing)?;
        self.store.settle_rental(&rental)?;

        tracing::info!(
            rental_id = %id,
            base_value = %settlement.base_value,
            final_value = %settlement.final_value,
            outcome = ?settlement.outcome,
            "rental settled"
        );
        Ok(settlement)
    }

    /// Fetch a rental.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the rental doesn't exist.
    pub fn get_rental(&self, id: RentalId) -> Result<Rental> {
        self.store
            .get_rental(id)?
            .ok_or_else(|| FleetError::not_found("rental", id))
    }

    /// List all rentals.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub fn list_rentals(&self) -> Result<Vec<Rental>> {
        Ok(self.store.list_rentals()?)
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// List notifications, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Storage` if the store fails.
    pub fn list_notifications(&self) -> Result<Vec<Notification>> {
        Ok(self.store.list_notifications()?)
    }
}
