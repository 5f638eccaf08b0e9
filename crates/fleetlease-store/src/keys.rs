//! Key encoding for `RocksDB` column families.
//!
//! Record keys are the 4-byte big-endian id, so iteration over positive ids
//! follows numeric order. Index keys are the normalized natural value.

use fleetlease_core::ids::{normalize_plate, normalize_tax_id};
use fleetlease_core::EntityId;

/// Key of a record in its primary column family.
#[must_use]
pub fn id_key<I: EntityId>(id: I) -> [u8; 4] {
    id.raw().to_be_bytes()
}

/// Decode a record key or index value back into an id.
///
/// Returns `None` if the slice is not exactly four bytes.
#[must_use]
pub fn decode_id<I: EntityId>(bytes: &[u8]) -> Option<I> {
    let raw: [u8; 4] = bytes.try_into().ok()?;
    Some(I::from_raw(i32::from_be_bytes(raw)))
}

/// Key of the plate uniqueness index.
#[must_use]
pub fn plate_key(plate: &str) -> Vec<u8> {
    normalize_plate(plate).into_bytes()
}

/// Key of the tax ID uniqueness index.
#[must_use]
pub fn tax_id_key(tax_id: &str) -> Vec<u8> {
    normalize_tax_id(tax_id).into_bytes()
}

/// Key of the license number uniqueness index.
#[must_use]
pub fn license_number_key(license_number: &str) -> Vec<u8> {
    license_number.trim().as_bytes().to_vec()
}
