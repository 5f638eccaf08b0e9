//! Identifier types and deterministic id allocation for fleetlease.
//!
//! Every record is keyed by a positive 32-bit integer derived from a natural
//! business key. The [`IdAllocator`] hashes the normalized key and, when the
//! caller's existence probe reports the candidate as taken, walks forward
//! (`id + 1`, `id + 2`, ...) until a free value is found.
//!
//! # Macro-based ID Types
//!
//! The `numeric_id_type!` macro reduces boilerplate for the identifier
//! newtypes, ensuring consistent serialization, parsing and display.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Default bound on the number of candidates probed per allocation.
pub const DEFAULT_MAX_PROBES: u32 = 1024;

/// Common behaviour of the numeric identifier newtypes.
pub trait EntityId: Copy + fmt::Display {
    /// Wrap a raw id value.
    fn from_raw(raw: i32) -> Self;

    /// Return the raw id value.
    fn raw(self) -> i32;
}

/// Macro to define an `i32`-backed identifier type with standard trait implementations.
///
/// This macro generates a newtype with implementations for:
/// - `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`, `Ord`
/// - `Serialize`, `Deserialize` (as a bare integer)
/// - `FromStr` (positive integers only), `Display`, `Debug`
/// - [`EntityId`]
macro_rules! numeric_id_type {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            /// Create an identifier from its raw value.
            #[must_use]
            pub const fn new(raw: i32) -> Self {
                Self(raw)
            }

            /// Return the raw value.
            #[must_use]
            pub const fn get(self) -> i32 {
                self.0
            }

            /// Return the big-endian bytes of the id (4 bytes).
            #[must_use]
            pub const fn to_bytes(self) -> [u8; 4] {
                self.0.to_be_bytes()
            }

            /// Create an identifier from big-endian bytes.
            #[must_use]
            pub const fn from_bytes(bytes: [u8; 4]) -> Self {
                Self(i32::from_be_bytes(bytes))
            }
        }

        impl EntityId for $name {
            fn from_raw(raw: i32) -> Self {
                Self(raw)
            }

            fn raw(self) -> i32 {
                self.0
            }
        }

        impl FromStr for $name {
            type Err = IdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let raw: i32 = s.trim().parse().map_err(|_| IdError::InvalidNumber)?;
                if raw <= 0 {
                    return Err(IdError::NotPositive(raw));
                }
                Ok(Self(raw))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

numeric_id_type!(VehicleId, "A vehicle identifier, derived from the license plate.");
numeric_id_type!(DriverId, "A driver identifier, derived from the tax ID.");
numeric_id_type!(
    RentalId,
    "A rental identifier, derived from the creation instant, vehicle and driver."
);
numeric_id_type!(
    NotificationId,
    "A notification identifier, derived from the processing instant and vehicle."
);

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The input is not an integer.
    #[error("invalid id format")]
    InvalidNumber,

    /// Ids are always strictly positive.
    #[error("id must be positive, got {0}")]
    NotPositive(i32),
}

/// A normalized natural key, the input of id derivation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(String);

impl NaturalKey {
    /// Key for a vehicle: the upper-cased plate.
    #[must_use]
    pub fn vehicle(plate: &str) -> Self {
        Self(normalize_plate(plate))
    }

    /// Key for a driver: the tax ID without punctuation.
    #[must_use]
    pub fn driver(tax_id: &str) -> Self {
        Self(normalize_tax_id(tax_id))
    }

    /// Key for a rental: creation ticks, vehicle id and driver id concatenated.
    #[must_use]
    pub fn rental(created_at: DateTime<Utc>, vehicle_id: VehicleId, driver_id: DriverId) -> Self {
        Self(format!("{}{vehicle_id}{driver_id}", ticks(created_at)))
    }

    /// Key for a notification: processing ticks and vehicle id concatenated.
    #[must_use]
    pub fn notification(processed_at: DateTime<Utc>, vehicle_id: VehicleId) -> Self {
        Self(format!("{}{vehicle_id}", ticks(processed_at)))
    }

    /// Return the normalized key text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Signed 32-bit hash of the key: the first four bytes of its SHA-256
    /// digest, big-endian.
    #[must_use]
    pub fn hash32(&self) -> i32 {
        let digest = Sha256::digest(self.0.as_bytes());
        i32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize a license plate for hashing and uniqueness checks.
#[must_use]
pub fn normalize_plate(plate: &str) -> String {
    plate.trim().to_uppercase()
}

/// Normalize a tax ID by stripping `.`, `/` and `-`.
#[must_use]
pub fn normalize_tax_id(tax_id: &str) -> String {
    tax_id
        .trim()
        .chars()
        .filter(|c| !matches!(c, '.' | '/' | '-'))
        .collect()
}

/// 100-nanosecond intervals since the Unix epoch.
#[must_use]
pub fn ticks(instant: DateTime<Utc>) -> i64 {
    instant
        .timestamp_nanos_opt()
        .map_or_else(|| instant.timestamp_micros().saturating_mul(10), |n| n / 100)
}

/// Map a raw hash to the first candidate id.
///
/// `i32::MIN` has no positive absolute value and maps to `i32::MAX`;
/// zero maps to `1`.
#[must_use]
pub const fn candidate_from_hash(hash: i32) -> i32 {
    match hash {
        i32::MIN => i32::MAX,
        0 => 1,
        h => h.abs(),
    }
}

const fn next_candidate(id: i32) -> i32 {
    if id == i32::MAX {
        1
    } else {
        id + 1
    }
}

/// No free id was found within the probe bound.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no free id for natural key {key:?} after {probes} probes")]
pub struct AllocationExhausted {
    /// The natural key being allocated.
    pub key: String,
    /// Number of candidates probed.
    pub probes: u32,
}

/// Deterministic id allocator with linear probing.
///
/// The allocator holds no state besides its probe bound; two calls with the
/// same key and the same probe answers return the same id.
#[derive(Debug, Clone, Copy)]
pub struct IdAllocator {
    max_probes: u32,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROBES)
    }
}

impl IdAllocator {
    /// Create an allocator probing at most `max_probes` candidates (minimum 1).
    #[must_use]
    pub const fn new(max_probes: u32) -> Self {
        Self {
            max_probes: if max_probes == 0 { 1 } else { max_probes },
        }
    }

    /// Return the probe bound.
    #[must_use]
    pub const fn max_probes(&self) -> u32 {
        self.max_probes
    }

    /// Allocate an id for `key`.
    ///
    /// `exists` reports whether a candidate is already taken; it may perform
    /// a storage lookup and its errors are returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns the probe's error, or [`AllocationExhausted`] converted into
    /// `E` when every probed candidate is taken.
    pub fn allocate<I, E, F>(&self, key: &NaturalKey, exists: F) -> Result<I, E>
    where
        I: EntityId,
        F: FnMut(I) -> Result<bool, E>,
        E: From<AllocationExhausted>,
    {
        self.allocate_from(key, candidate_from_hash(key.hash32()), exists)
    }

    /// Probe upward from `candidate`.
    fn allocate_from<I, E, F>(
        &self,
        key: &NaturalKey,
        mut candidate: i32,
        mut exists: F,
    ) -> Result<I, E>
    where
        I: EntityId,
        F: FnMut(I) -> Result<bool, E>,
        E: From<AllocationExhausted>,
    {
        for _ in 0..self.max_probes {
            let id = I::from_raw(candidate);
            if !exists(id)? {
                return Ok(id);
            }
            candidate = next_candidate(candidate);
        }
        Err(AllocationExhausted {
            key: key.as_str().to_owned(),
            probes: self.max_probes,
        }
        .into())
    }
}
