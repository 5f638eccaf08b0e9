//! Driver registry records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::FleetError;
use crate::ids::{normalize_tax_id, DriverId, NaturalKey};

/// License image formats accepted for upload.
const LICENSE_IMAGE_EXTENSIONS: [&str; 2] = ["png", "bmp"];

/// Driver's license category.
///
/// `A+B` is kept distinct from `AB`; both allow motorcycle rentals.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LicenseCategory {
    /// Motorcycles.
    A,
    /// Cars.
    B,
    /// Motorcycles and cars.
    AB,
    /// Motorcycles and cars, as written `A+B` on registration.
    #[serde(rename = "A+B")]
    APlusB,
}

impl LicenseCategory {
    /// Whether this category may rent motorcycles (A, AB or A+B).
    #[must_use]
    pub const fn can_rent_motorcycles(self) -> bool {
        matches!(self, Self::A | Self::AB | Self::APlusB)
    }

    /// Canonical text of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::AB => "AB",
            Self::APlusB => "A+B",
        }
    }
}

impl FromStr for LicenseCategory {
    type Err = FleetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "A" => Ok(Self::A),
            "B" => Ok(Self::B),
            "AB" => Ok(Self::AB),
            "A+B" => Ok(Self::APlusB),
            _ => Err(FleetError::InvalidLicenseCategory(s.to_owned())),
        }
    }
}

impl fmt::Display for LicenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Driver {
    /// Identifier derived from the tax ID.
    pub id: DriverId,

    /// Full name.
    pub name: String,

    /// Tax ID as registered (unique after normalization).
    pub tax_id: String,

    /// Date of birth.
    pub birth_date: NaiveDate,

    /// Driver's license number (unique).
    pub license_number: String,

    /// License category.
    pub license_category: LicenseCategory,

    /// Reference to the uploaded license image, if any.
    pub license_image: Option<String>,
}

impl Driver {
    /// Tax ID in the normalized form used for uniqueness.
    #[must_use]
    pub fn normalized_tax_id(&self) -> String {
        normalize_tax_id(&self.tax_id)
    }
}

/// Input for registering a driver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDriver {
    /// Full name.
    pub name: String,
    /// Tax ID.
    pub tax_id: String,
    /// Date of birth.
    pub birth_date: NaiveDate,
    /// Driver's license number.
    pub license_number: String,
    /// License category.
    pub license_category: LicenseCategory,
}

impl NewDriver {
    /// Build a registration, parsing the category case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::InvalidLicenseCategory` for anything outside
    /// A, B, AB and A+B.
    pub fn parse(
        name: impl Into<String>,
        tax_id: impl Into<String>,
        birth_date: NaiveDate,
        license_number: impl Into<String>,
        license_category: &str,
    ) -> Result<Self, FleetError> {
        Ok(Self {
            name: name.into(),
            tax_id: tax_id.into(),
            birth_date,
            license_number: license_number.into(),
            license_category: license_category.parse()?,
        })
    }

    /// The natural key the driver id is derived from.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::driver(&self.tax_id)
    }

    /// Turn the registration into a record with the allocated id.
    #[must_use]
    pub fn into_driver(self, id: DriverId) -> Driver {
        Driver {
            id,
            name: self.name,
            tax_id: self.tax_id,
            birth_date: self.birth_date,
            license_number: self.license_number.trim().to_owned(),
            license_category: self.license_category,
            license_image: None,
        }
    }
}

/// Build the stored reference for a driver's license image.
///
/// # Errors
///
/// Returns `FleetError::InvalidLicenseImage` unless the file name ends in
/// `.png` or `.bmp` (case-insensitive).
pub fn license_image_reference(driver_id: DriverId, file_name: &str) -> Result<String, FleetError> {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| LICENSE_IMAGE_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| {
            FleetError::InvalidLicenseImage(format!(
                "{file_name:?} is not a .png or .bmp file"
            ))
        })?;
    Ok(format!("{driver_id}_license.{extension}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_parsing_is_case_insensitive() {
        assert_eq!("a".parse::<LicenseCategory>().unwrap(), LicenseCategory::A);
        assert_eq!("ab".parse::<LicenseCategory>().unwrap(), LicenseCategory::AB);
        assert_eq!(
            "a+b".parse::<LicenseCategory>().unwrap(),
            LicenseCategory::APlusB
        );
        assert!(matches!(
            "C".parse::<LicenseCategory>(),
            Err(FleetError::InvalidLicenseCategory(_))
        ));
    }

    #[test]
    fn a_plus_b_stays_distinct() {
        let category: LicenseCategory = "A+B".parse().unwrap();
        assert_ne!(category, LicenseCategory::AB);
        assert_eq!(category.to_string(), "A+B");
        assert_eq!(serde_json::to_string(&category).unwrap(), "\"A+B\"");
    }

    #[test]
    fn motorcycle_eligibility() {
        assert!(LicenseCategory::A.can_rent_motorcycles());
        assert!(LicenseCategory::AB.can_rent_motorcycles());
        assert!(LicenseCategory::APlusB.can_rent_motorcycles());
        assert!(!LicenseCategory::B.can_rent_motorcycles());
    }

    #[test]
    fn new_driver_has_no_license_image() {
        let driver = NewDriver::parse(
            "Ana",
            "12.345.678/0001-90",
            NaiveDate::from_ymd_opt(1990, 5, 17).unwrap(),
            "CNH123",
            "a",
        )
        .unwrap()
        .into_driver(DriverId::new(5));

        assert!(driver.license_image.is_none());
        assert_eq!(driver.normalized_tax_id(), "12345678000190");
    }

    #[test]
    fn license_image_formats() {
        let id = DriverId::new(9);
        assert_eq!(license_image_reference(id, "scan.PNG").unwrap(), "9_license.png");
        assert_eq!(license_image_reference(id, "a.b.bmp").unwrap(), "9_license.bmp");
        assert!(license_image_reference(id, "scan.jpg").is_err());
        assert!(license_image_reference(id, "scan").is_err());
    }
}
