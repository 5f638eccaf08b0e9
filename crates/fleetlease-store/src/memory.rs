//! In-memory storage implementation.
//!
//! All tables live behind a single `RwLock`, so every check-and-write runs
//! under one write guard and is atomic with respect to other callers.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use fleetlease_core::ids::{normalize_plate, normalize_tax_id};
use fleetlease_core::{
    Driver, DriverId, Notification, NotificationId, Rental, RentalId, Vehicle, VehicleId,
};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Debug, Default)]
struct Tables {
    vehicles: HashMap<VehicleId, Vehicle>,
    plates: HashMap<String, VehicleId>,
    drivers: HashMap<DriverId, Driver>,
    tax_ids: HashMap<String, DriverId>,
    license_numbers: HashMap<String, DriverId>,
    rentals: HashMap<RentalId, Rental>,
    open_rentals: HashMap<VehicleId, RentalId>,
    notifications: HashMap<NotificationId, Notification>,
}

/// A thread-safe in-memory store.
///
/// Ideal for testing or deployments where persistence is not required.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    /// Creates a new, empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::Database("store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    // =========================================================================
    // Vehicle Operations
    // =========================================================================

    fn vehicle_exists(&self, id: VehicleId) -> Result<bool> {
        Ok(self.read()?.vehicles.contains_key(&id))
    }

    fn plate_exists(&self, plate: &str) -> Result<bool> {
        Ok(self.read()?.plates.contains_key(&normalize_plate(plate)))
    }

    fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        let mut tables = self.write()?;
        let plate = vehicle.normalized_plate();

        if tables.plates.contains_key(&plate) {
            return Err(StoreError::duplicate("plate", plate));
        }
        if tables.vehicles.contains_key(&vehicle.id) {
            return Err(StoreError::duplicate("id", vehicle.id.to_string()));
        }

        tables.plates.insert(plate, vehicle.id);
        tables.vehicles.insert(vehicle.id, vehicle.clone());
        Ok(())
    }

    fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        Ok(self.read()?.vehicles.get(&id).cloned())
    }

    fn list_vehicles(&self, plate_filter: Option<&str>) -> Result<Vec<Vehicle>> {
        let filter = plate_filter.map(normalize_plate);
        let tables = self.read()?;
        let mut vehicles: Vec<Vehicle> = tables
            .vehicles
            .values()
            .filter(|v| {
                filter
                    .as_deref()
                    .map_or(true, |f| v.normalized_plate().contains(f))
            })
            .cloned()
            .collect();
        vehicles.sort_by_key(|v| v.id);
        Ok(vehicles)
    }

    fn update_vehicle_plate(&self, id: VehicleId, plate: &str) -> Result<Vehicle> {
        let mut tables = self.write()?;
        let new_plate = normalize_plate(plate);

        let old_plate = tables
            .vehicles
            .get(&id)
            .map(Vehicle::normalized_plate)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;

        if tables
            .plates
            .get(&new_plate)
            .is_some_and(|owner| *owner != id)
        {
            return Err(StoreError::duplicate("plate", new_plate));
        }

        tables.plates.remove(&old_plate);
        tables.plates.insert(new_plate, id);

        let vehicle = tables
            .vehicles
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;
        vehicle.plate = plate.trim().to_owned();
        Ok(vehicle.clone())
    }

    fn delete_vehicle(&self, id: VehicleId) -> Result<()> {
        let mut tables = self.write()?;

        if !tables.vehicles.contains_key(&id) {
            return Err(StoreError::not_found("vehicle", id));
        }
        if tables.open_rentals.contains_key(&id) {
            return Err(StoreError::VehicleRented { vehicle_id: id });
        }

        if let Some(vehicle) = tables.vehicles.remove(&id) {
            tables.plates.remove(&vehicle.normalized_plate());
        }
        Ok(())
    }

    // =========================================================================
    // Driver Operations
    // =========================================================================

    fn driver_exists(&self, id: DriverId) -> Result<bool> {
        Ok(self.read()?.drivers.contains_key(&id))
    }

    fn tax_id_exists(&self, tax_id: &str) -> Result<bool> {
        Ok(self.read()?.tax_ids.contains_key(&normalize_tax_id(tax_id)))
    }

    fn license_number_exists(&self, license_number: &str) -> Result<bool> {
        Ok(self
            .read()?
            .license_numbers
            .contains_key(license_number.trim()))
    }

    fn insert_driver(&self, driver: &Driver) -> Result<()> {
        let mut tables = self.write()?;
        let tax_id = driver.normalized_tax_id();

        if tables.tax_ids.contains_key(&tax_id) {
            return Err(StoreError::duplicate("tax_id", tax_id));
        }
        if tables.license_numbers.contains_key(&driver.license_number) {
            return Err(StoreError::duplicate(
                "license_number",
                driver.license_number.clone(),
            ));
        }
        if tables.drivers.contains_key(&driver.id) {
            return Err(StoreError::duplicate("id", driver.id.to_string()));
        }

        tables.tax_ids.insert(tax_id, driver.id);
        tables
            .license_numbers
            .insert(driver.license_number.clone(), driver.id);
        tables.drivers.insert(driver.id, driver.clone());
        Ok(())
    }

    fn get_driver(&self, id: DriverId) -> Result<Option<Driver>> {
        Ok(self.read()?.drivers.get(&id).cloned())
    }

    fn set_license_image(&self, id: DriverId, reference: &str) -> Result<Driver> {
        let mut tables = self.write()?;
        let driver = tables
            .drivers
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("driver", id))?;
        driver.license_image = Some(reference.to_owned());
        Ok(driver.clone())
    }

    // =========================================================================
    // Rental Operations
    // =========================================================================

    fn rental_exists(&self, id: RentalId) -> Result<bool> {
        Ok(self.read()?.rentals.contains_key(&id))
    }

    fn has_open_rental(&self, vehicle_id: VehicleId) -> Result<bool> {
        Ok(self.read()?.open_rentals.contains_key(&vehicle_id))
    }

    fn insert_rental(&self, rental: &Rental) -> Result<()> {
        let mut tables = self.write()?;

        if tables.rentals.contains_key(&rental.id) {
            return Err(StoreError::duplicate("id", rental.id.to_string()));
        }
        if rental.is_open() {
            if tables.open_rentals.contains_key(&rental.vehicle_id) {
                return Err(StoreError::VehicleRented {
                    vehicle_id: rental.vehicle_id,
                });
            }
            tables.open_rentals.insert(rental.vehicle_id, rental.id);
        }

        tables.rentals.insert(rental.id, rental.clone());
        Ok(())
    }

    fn get_rental(&self, id: RentalId) -> Result<Option<Rental>> {
        Ok(self.read()?.rentals.get(&id).cloned())
    }

    fn list_rentals(&self) -> Result<Vec<Rental>> {
        let mut rentals: Vec<Rental> = self.read()?.rentals.values().cloned().collect();
        rentals.sort_by_key(|r| r.id);
        Ok(rentals)
    }

    fn settle_rental(&self, rental: &Rental) -> Result<()> {
        let mut tables = self.write()?;

        let stored = tables
            .rentals
            .get(&rental.id)
            .ok_or_else(|| StoreError::not_found("rental", rental.id))?;
        if let Some(returned_on) = stored.actual_end_date {
            return Err(StoreError::AlreadyReturned {
                rental_id: rental.id,
                returned_on,
            });
        }

        if !rental.is_open() {
            tables.open_rentals.remove(&rental.vehicle_id);
        }
        tables.rentals.insert(rental.id, rental.clone());
        Ok(())
    }

    // =========================================================================
    // Notification Operations
    // =========================================================================

    fn notification_exists(&self, id: NotificationId) -> Result<bool> {
        Ok(self.read()?.notifications.contains_key(&id))
    }

    fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let mut tables = self.write()?;
        if tables.notifications.contains_key(&notification.id) {
            return Err(StoreError::duplicate("id", notification.id.to_string()));
        }
        tables
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    fn list_notifications(&self) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> =
            self.read()?.notifications.values().cloned().collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(notifications)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use fleetlease_core::{NewDriver, NewVehicle, RentalPricing};
    use rust_decimal_macros::dec;

    fn vehicle(id: i32, plate: &str) -> Vehicle {
        NewVehicle::new(2024, "Sport 110i", plate).into_vehicle(VehicleId::new(id))
    }

    fn driver(id: i32, tax_id: &str, license_number: &str) -> Driver {
        NewDriver::parse(
            "Ana",
            tax_id,
            NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            license_number,
            "A",
        )
        .unwrap()
        .into_driver(DriverId::new(id))
    }

    fn open_rental(id: i32, vehicle_id: i32) -> Rental {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap();
        let quote = RentalPricing::default().quote(7, now).unwrap();
        Rental {
            id: RentalId::new(id),
            vehicle_id: VehicleId::new(vehicle_id),
            driver_id: DriverId::new(1),
            plan_days: 7,
            created_at: now,
            start_date: quote.start_date,
            expected_end_date: quote.expected_end_date,
            actual_end_date: None,
            total_value: quote.total_value,
        }
    }

    #[test]
    fn vehicle_crud() {
        let store = MemoryStore::new();
        store.insert_vehicle(&vehicle(1, "ABC1D23")).unwrap();

        assert!(store.vehicle_exists(VehicleId::new(1)).unwrap());
        assert!(store.plate_exists("abc1d23").unwrap());

        let updated = store
            .update_vehicle_plate(VehicleId::new(1), "XYZ9K87")
            .unwrap();
        assert_eq!(updated.plate, "XYZ9K87");
        assert!(!store.plate_exists("ABC1D23").unwrap());

        store.delete_vehicle(VehicleId::new(1)).unwrap();
        assert!(store.get_vehicle(VehicleId::new(1)).unwrap().is_none());
        assert!(!store.plate_exists("XYZ9K87").unwrap());
    }

    #[test]
    fn duplicate_plate_is_rejected_at_write() {
        let store = MemoryStore::new();
        store.insert_vehicle(&vehicle(1, "ABC1D23")).unwrap();

        let err = store.insert_vehicle(&vehicle(2, "abc1d23")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateKey { field: "plate", .. }));
        assert!(store.get_vehicle(VehicleId::new(2)).unwrap().is_none());
    }

    #[test]
    fn plate_update_checks_other_vehicles_only() {
        let store = MemoryStore::new();
        store.insert_vehicle(&vehicle(1, "AAA1111")).unwrap();
        store.insert_vehicle(&vehicle(2, "BBB2222")).unwrap();

        assert!(store
            .update_vehicle_plate(VehicleId::new(1), "aaa1111")
            .is_ok());
        assert!(matches!(
            store.update_vehicle_plate(VehicleId::new(1), "BBB2222"),
            Err(StoreError::DuplicateKey { .. })
        ));
        assert!(matches!(
            store.update_vehicle_plate(VehicleId::new(3), "CCC3333"),
            Err(StoreError::NotFound { .. })
        ));
    }

    #[test]
    fn plate_filter_is_case_insensitive_substring() {
        let store = MemoryStore::new();
        store.insert_vehicle(&vehicle(2, "ABC1D23")).unwrap();
        store.insert_vehicle(&vehicle(1, "XYZ1D99")).unwrap();
        store.insert_vehicle(&vehicle(3, "QQQ0000")).unwrap();

        let all = store.list_vehicles(None).unwrap();
        assert_eq!(all.iter().map(|v| v.id.get()).collect::<Vec<_>>(), vec![1, 2, 3]);

        let filtered = store.list_vehicles(Some("1d")).unwrap();
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn driver_unique_keys() {
        let store = MemoryStore::new();
        store
            .insert_driver(&driver(1, "12.345.678/0001-90", "CNH1"))
            .unwrap();

        assert!(store.tax_id_exists("12345678000190").unwrap());
        assert!(store.license_number_exists("CNH1").unwrap());
        assert!(matches!(
            store.insert_driver(&driver(2, "12345678000190", "CNH2")),
            Err(StoreError::DuplicateKey { field: "tax_id", .. })
        ));
        assert!(matches!(
            store.insert_driver(&driver(3, "99999999000199", "CNH1")),
            Err(StoreError::DuplicateKey {
                field: "license_number",
                ..
            })
        ));
    }

    #[test]
    fn license_image_is_recorded() {
        let store = MemoryStore::new();
        store.insert_driver(&driver(1, "111", "CNH1")).unwrap();

        let updated = store
            .set_license_image(DriverId::new(1), "1_license.png")
            .unwrap();
        assert_eq!(updated.license_image.as_deref(), Some("1_license.png"));
        assert!(store.set_license_image(DriverId::new(2), "x.png").is_err());
    }

    #[test]
    fn second_open_rental_for_vehicle_is_rejected() {
        let store = MemoryStore::new();
        store.insert_rental(&open_rental(1, 10)).unwrap();

        assert!(store.has_open_rental(VehicleId::new(10)).unwrap());
        assert!(matches!(
            store.insert_rental(&open_rental(2, 10)),
            Err(StoreError::VehicleRented { .. })
        ));
    }

    #[test]
    fn rented_vehicle_cannot_be_deleted_until_settled() {
        let store = MemoryStore::new();
        store.insert_vehicle(&vehicle(10, "ABC1D23")).unwrap();
        let mut rental = open_rental(1, 10);
        store.insert_rental(&rental).unwrap();

        assert!(matches!(
            store.delete_vehicle(VehicleId::new(10)),
            Err(StoreError::VehicleRented { .. })
        ));

        rental
            .close(rental.expected_end_date, &RentalPricing::default())
            .unwrap();
        store.settle_rental(&rental).unwrap();

        assert!(!store.has_open_rental(VehicleId::new(10)).unwrap());
        store.delete_vehicle(VehicleId::new(10)).unwrap();
    }

    #[test]
    fn settling_twice_is_rejected() {
        let store = MemoryStore::new();
        let mut rental = open_rental(1, 10);
        store.insert_rental(&rental).unwrap();
        rental
            .close(rental.expected_end_date, &RentalPricing::default())
            .unwrap();
        store.settle_rental(&rental).unwrap();

        assert!(matches!(
            store.settle_rental(&rental),
            Err(StoreError::AlreadyReturned { .. })
        ));
        let stored = store.get_rental(RentalId::new(1)).unwrap().unwrap();
        assert_eq!(stored.total_value, dec!(210.00));
    }

    #[test]
    fn notifications_newest_first() {
        let store = MemoryStore::new();
        for (id, hour) in [(1, 8), (2, 10), (3, 9)] {
            store
                .insert_notification(&Notification {
                    id: NotificationId::new(id),
                    vehicle_id: VehicleId::new(1),
                    model_year: 2024,
                    message: String::new(),
                    created_at: Utc.with_ymd_and_hms(2025, 1, 1, hour, 0, 0).unwrap(),
                })
                .unwrap();
        }

        let ids: Vec<i32> = store
            .list_notifications()
            .unwrap()
            .iter()
            .map(|n| n.id.get())
            .collect();
        assert_eq!(ids, vec![2, 3, 1]);
        assert!(store.notification_exists(NotificationId::new(3)).unwrap());
    }
}
