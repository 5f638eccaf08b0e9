//! Column families used by the `RocksDB` backend.

/// Column family names.
pub mod cf {
    /// Vehicle records, keyed by `vehicle_id`.
    pub const VEHICLES: &str = "vehicles";

    /// Index: normalized plate to `vehicle_id`.
    pub const VEHICLE_PLATES: &str = "vehicle_plates";

    /// Driver records, keyed by `driver_id`.
    pub const DRIVERS: &str = "drivers";

    /// Index: normalized tax ID to `driver_id`.
    pub const DRIVER_TAX_IDS: &str = "driver_tax_ids";

    /// Index: license number to `driver_id`.
    pub const DRIVER_LICENSE_NUMBERS: &str = "driver_license_numbers";

    /// Rental records, keyed by `rental_id`.
    pub const RENTALS: &str = "rentals";

    /// Index: `vehicle_id` to the `rental_id` of its open rental.
    /// Removed when the rental is settled.
    pub const OPEN_RENTALS: &str = "open_rentals";

    /// Notification records, keyed by `notification_id`.
    pub const NOTIFICATIONS: &str = "notifications";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::VEHICLES,
        cf::VEHICLE_PLATES,
        cf::DRIVERS,
        cf::DRIVER_TAX_IDS,
        cf::DRIVER_LICENSE_NUMBERS,
        cf::RENTALS,
        cf::OPEN_RENTALS,
        cf::NOTIFICATIONS,
    ]
}
