//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.
//! Every check-and-write runs under `write_lock` and lands as one
//! `WriteBatch`, so unique indexes and the open-rental index never diverge
//! from the records they point at.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use fleetlease_core::{
    Driver, DriverId, Notification, NotificationId, Rental, RentalId, Vehicle, VehicleId,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    write_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!("opened rocksdb store");

        Ok(Self {
            db: Arc::new(db),
            write_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("write lock poisoned".into()))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get_raw(&self, cf_name: &str, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn contains(&self, cf_name: &str, key: &[u8]) -> Result<bool> {
        Ok(self.get_raw(cf_name, key)?.is_some())
    }

    /// Decode every value of a column family, in key order.
    fn scan<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item.map_err(|e| StoreError::Database(e.to_string()))?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Vehicle Operations
    // =========================================================================

    fn vehicle_exists(&self, id: VehicleId) -> Result<bool> {
        self.contains(cf::VEHICLES, &keys::id_key(id))
    }

    fn plate_exists(&self, plate: &str) -> Result<bool> {
        self.contains(cf::VEHICLE_PLATES, &keys::plate_key(plate))
    }

    fn insert_vehicle(&self, vehicle: &Vehicle) -> Result<()> {
        let _guard = self.lock()?;
        let plate_key = keys::plate_key(&vehicle.plate);
        let id_key = keys::id_key(vehicle.id);

        if self.contains(cf::VEHICLE_PLATES, &plate_key)? {
            return Err(StoreError::duplicate("plate", vehicle.normalized_plate()));
        }
        if self.contains(cf::VEHICLES, &id_key)? {
            return Err(StoreError::duplicate("id", vehicle.id.to_string()));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(cf::VEHICLES)?, id_key, Self::serialize(vehicle)?);
        batch.put_cf(&self.cf(cf::VEHICLE_PLATES)?, plate_key, id_key);
        self.write(batch)
    }

    fn get_vehicle(&self, id: VehicleId) -> Result<Option<Vehicle>> {
        self.get(cf::VEHICLES, &keys::id_key(id))
    }

    fn list_vehicles(&self, plate_filter: Option<&str>) -> Result<Vec<Vehicle>> {
        let vehicles: Vec<Vehicle> = self.scan(cf::VEHICLES)?;
        Ok(match plate_filter {
            Some(filter) => {
                let filter = fleetlease_core::ids::normalize_plate(filter);
                vehicles
                    .into_iter()
                    .filter(|v| v.normalized_plate().contains(&filter))
                    .collect()
            }
            None => vehicles,
        })
    }

    fn update_vehicle_plate(&self, id: VehicleId, plate: &str) -> Result<Vehicle> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(id);

        let mut vehicle: Vehicle = self
            .get(cf::VEHICLES, &id_key)?
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;

        let old_key = keys::plate_key(&vehicle.plate);
        let new_key = keys::plate_key(plate);

        if let Some(owner) = self.get_raw(cf::VEHICLE_PLATES, &new_key)? {
            if keys::decode_id::<VehicleId>(&owner) != Some(id) {
                return Err(StoreError::duplicate(
                    "plate",
                    fleetlease_core::ids::normalize_plate(plate),
                ));
            }
        }

        vehicle.plate = plate.trim().to_owned();

        let cf_plates = self.cf(cf::VEHICLE_PLATES)?;
        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_plates, old_key);
        batch.put_cf(&cf_plates, new_key, id_key);
        batch.put_cf(&self.cf(cf::VEHICLES)?, id_key, Self::serialize(&vehicle)?);
        self.write(batch)?;

        Ok(vehicle)
    }

    fn delete_vehicle(&self, id: VehicleId) -> Result<()> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(id);

        let vehicle: Vehicle = self
            .get(cf::VEHICLES, &id_key)?
            .ok_or_else(|| StoreError::not_found("vehicle", id))?;
        if self.contains(cf::OPEN_RENTALS, &id_key)? {
            return Err(StoreError::VehicleRented { vehicle_id: id });
        }

        let mut batch = WriteBatch::default();
        batch.delete_cf(&self.cf(cf::VEHICLES)?, id_key);
        batch.delete_cf(&self.cf(cf::VEHICLE_PLATES)?, keys::plate_key(&vehicle.plate));
        self.write(batch)
    }

    // =========================================================================
    // Driver Operations
    // =========================================================================

    fn driver_exists(&self, id: DriverId) -> Result<bool> {
        self.contains(cf::DRIVERS, &keys::id_key(id))
    }

    fn tax_id_exists(&self, tax_id: &str) -> Result<bool> {
        self.contains(cf::DRIVER_TAX_IDS, &keys::tax_id_key(tax_id))
    }

    fn license_number_exists(&self, license_number: &str) -> Result<bool> {
        self.contains(
            cf::DRIVER_LICENSE_NUMBERS,
            &keys::license_number_key(license_number),
        )
    }

    fn insert_driver(&self, driver: &Driver) -> Result<()> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(driver.id);
        let tax_key = keys::tax_id_key(&driver.tax_id);
        let license_key = keys::license_number_key(&driver.license_number);

        if self.contains(cf::DRIVER_TAX_IDS, &tax_key)? {
            return Err(StoreError::duplicate("tax_id", driver.normalized_tax_id()));
        }
        if self.contains(cf::DRIVER_LICENSE_NUMBERS, &license_key)? {
            return Err(StoreError::duplicate(
                "license_number",
                driver.license_number.clone(),
            ));
        }
        if self.contains(cf::DRIVERS, &id_key)? {
            return Err(StoreError::duplicate("id", driver.id.to_string()));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(cf::DRIVERS)?, id_key, Self::serialize(driver)?);
        batch.put_cf(&self.cf(cf::DRIVER_TAX_IDS)?, tax_key, id_key);
        batch.put_cf(&self.cf(cf::DRIVER_LICENSE_NUMBERS)?, license_key, id_key);
        self.write(batch)
    }

    fn get_driver(&self, id: DriverId) -> Result<Option<Driver>> {
        self.get(cf::DRIVERS, &keys::id_key(id))
    }

    fn set_license_image(&self, id: DriverId, reference: &str) -> Result<Driver> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(id);

        let mut driver: Driver = self
            .get(cf::DRIVERS, &id_key)?
            .ok_or_else(|| StoreError::not_found("driver", id))?;
        driver.license_image = Some(reference.to_owned());

        let cf = self.cf(cf::DRIVERS)?;
        self.db
            .put_cf(&cf, id_key, Self::serialize(&driver)?)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(driver)
    }

    // =========================================================================
    // Rental Operations
    // =========================================================================

    fn rental_exists(&self, id: RentalId) -> Result<bool> {
        self.contains(cf::RENTALS, &keys::id_key(id))
    }

    fn has_open_rental(&self, vehicle_id: VehicleId) -> Result<bool> {
        self.contains(cf::OPEN_RENTALS, &keys::id_key(vehicle_id))
    }

    fn insert_rental(&self, rental: &Rental) -> Result<()> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(rental.id);
        let vehicle_key = keys::id_key(rental.vehicle_id);

        if self.contains(cf::RENTALS, &id_key)? {
            return Err(StoreError::duplicate("id", rental.id.to_string()));
        }

        let mut batch = WriteBatch::default();
        if rental.is_open() {
            if self.contains(cf::OPEN_RENTALS, &vehicle_key)? {
                return Err(StoreError::VehicleRented {
                    vehicle_id: rental.vehicle_id,
                });
            }
            batch.put_cf(&self.cf(cf::OPEN_RENTALS)?, vehicle_key, id_key);
        }
        batch.put_cf(&self.cf(cf::RENTALS)?, id_key, Self::serialize(rental)?);
        self.write(batch)
    }

    fn get_rental(&self, id: RentalId) -> Result<Option<Rental>> {
        self.get(cf::RENTALS, &keys::id_key(id))
    }

    fn list_rentals(&self) -> Result<Vec<Rental>> {
        self.scan(cf::RENTALS)
    }

    fn settle_rental(&self, rental: &Rental) -> Result<()> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(rental.id);

        let stored: Rental = self
            .get(cf::RENTALS, &id_key)?
            .ok_or_else(|| StoreError::not_found("rental", rental.id))?;
        if let Some(returned_on) = stored.actual_end_date {
            return Err(StoreError::AlreadyReturned {
                rental_id: rental.id,
                returned_on,
            });
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&self.cf(cf::RENTALS)?, id_key, Self::serialize(rental)?);
        if !rental.is_open() {
            batch.delete_cf(&self.cf(cf::OPEN_RENTALS)?, keys::id_key(rental.vehicle_id));
        }
        self.write(batch)
    }

    // =========================================================================
    // Notification Operations
    // =========================================================================

    fn notification_exists(&self, id: NotificationId) -> Result<bool> {
        self.contains(cf::NOTIFICATIONS, &keys::id_key(id))
    }

    fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let _guard = self.lock()?;
        let id_key = keys::id_key(notification.id);

        if self.contains(cf::NOTIFICATIONS, &id_key)? {
            return Err(StoreError::duplicate("id", notification.id.to_string()));
        }

        let cf = self.cf(cf::NOTIFICATIONS)?;
        self.db
            .put_cf(&cf, id_key, Self::serialize(notification)?)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_notifications(&self) -> Result<Vec<Notification>> {
        let mut notifications: Vec<Notification> = self.scan(cf::NOTIFICATIONS)?;
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(notifications)
    }
}
