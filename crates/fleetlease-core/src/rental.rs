//! Rental contracts and settlement.
//!
//! Opening a rental is a two-stage process: [`open_rental`] validates the
//! request and prices it into a [`RentalDraft`], whose natural key is then
//! used to allocate the id before [`RentalDraft::into_rental`] produces the
//! record to persist. Closing goes through [`Rental::close`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::driver::LicenseCategory;
use crate::error::{FleetError, Result};
use crate::ids::{DriverId, NaturalKey, RentalId, VehicleId};
use crate::pricing::{RentalPricing, RentalQuote};

/// A rental contract.
///
/// `actual_end_date == None` means the rental is open and the vehicle is out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rental {
    /// Identifier derived from creation instant, vehicle and driver.
    pub id: RentalId,

    /// The rented vehicle.
    pub vehicle_id: VehicleId,

    /// The renting driver.
    pub driver_id: DriverId,

    /// Plan length in days.
    pub plan_days: u32,

    /// When the contract was created.
    pub created_at: DateTime<Utc>,

    /// Midnight of the day after creation.
    pub start_date: DateTime<Utc>,

    /// `start_date + plan_days`.
    pub expected_end_date: DateTime<Utc>,

    /// Return date, set at settlement.
    pub actual_end_date: Option<DateTime<Utc>>,

    /// Contract value; replaced by the settled value on return.
    pub total_value: Decimal,
}

impl Rental {
    /// Whether the rental has not been returned yet.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.actual_end_date.is_none()
    }

    /// Settle the rental returned at `actual_end` and record the outcome.
    ///
    /// # Errors
    ///
    /// - `FleetError::AlreadyReturned` if the rental is closed.
    /// - `FleetError::InvalidPlan` if the plan is no longer priced.
    pub fn close(
        &mut self,
        actual_end: DateTime<Utc>,
        pricing: &RentalPricing,
    ) -> Result<Settlement> {
        let settlement = pricing.settle(self, actual_end)?;
        self.actual_end_date = Some(settlement.actual_end_date);
        self.total_value = settlement.final_value;
        Ok(settlement)
    }
}

/// How a rental was returned relative to its expected end date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReturnOutcome {
    /// Returned on the expected day.
    OnTime,

    /// Returned before the expected day.
    Early {
        /// Days not used.
        unused_days: i64,
        /// `daily_rate * unused_days`, refunded.
        unused_value: Decimal,
        /// Share of the refunded value charged back.
        penalty: Decimal,
    },

    /// Returned after the expected day.
    Late {
        /// Days past the expected end.
        late_days: i64,
        /// `late_fee_per_day * late_days`.
        surcharge: Decimal,
    },
}

/// Result of closing a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    /// The settled rental.
    pub rental_id: RentalId,
    /// Recorded return date (midnight of the return day).
    pub actual_end_date: DateTime<Utc>,
    /// Value before settlement.
    pub base_value: Decimal,
    /// Value after penalties or surcharges.
    pub final_value: Decimal,
    /// Early/late breakdown.
    pub outcome: ReturnOutcome,
}

/// Request to open a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenRentalRequest {
    /// Vehicle to rent.
    pub vehicle_id: VehicleId,
    /// Renting driver.
    pub driver_id: DriverId,
    /// Plan length in days.
    pub plan_days: u32,
    /// Contract creation instant.
    pub now: DateTime<Utc>,
}

/// Facts about the request the caller looked up in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalEligibility {
    /// Whether the vehicle exists.
    pub vehicle_exists: bool,
    /// The driver's license category, `None` if the driver doesn't exist.
    pub driver_category: Option<LicenseCategory>,
    /// Whether the vehicle already has an open rental.
    pub vehicle_has_open_rental: bool,
}

/// A validated, priced rental awaiting its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalDraft {
    /// Vehicle to rent.
    pub vehicle_id: VehicleId,
    /// Renting driver.
    pub driver_id: DriverId,
    /// Contract creation instant.
    pub created_at: DateTime<Utc>,
    /// Dates and value.
    pub quote: RentalQuote,
}

impl RentalDraft {
    /// The natural key the rental id is derived from.
    #[must_use]
    pub fn natural_key(&self) -> NaturalKey {
        NaturalKey::rental(self.created_at, self.vehicle_id, self.driver_id)
    }

    /// Produce the open rental record.
    #[must_use]
    pub fn into_rental(self, id: RentalId) -> Rental {
        Rental {
            id,
            vehicle_id: self.vehicle_id,
            driver_id: self.driver_id,
            plan_days: self.quote.plan_days,
            created_at: self.created_at,
            start_date: self.quote.start_date,
            expected_end_date: self.quote.expected_end_date,
            actual_end_date: None,
            total_value: self.quote.total_value,
        }
    }
}

/// Validate and price a rental request.
///
/// Checks run in order: plan, vehicle, driver, license category,
/// availability.
///
/// # Errors
///
/// `InvalidPlan`, `NotFound`, `IneligibleDriver` or `VehicleUnavailable`.
pub fn open_rental(
    request: &OpenRentalRequest,
    eligibility: &RentalEligibility,
    pricing: &RentalPricing,
) -> Result<RentalDraft> {
    let quote = pricing.quote(request.plan_days, request.now)?;

    if !eligibility.vehicle_exists {
        return Err(FleetError::not_found("vehicle", request.vehicle_id));
    }

    let category = eligibility
        .driver_category
        .ok_or_else(|| FleetError::not_found("driver", request.driver_id))?;
    if !category.can_rent_motorcycles() {
        return Err(FleetError::IneligibleDriver { category });
    }

    if eligibility.vehicle_has_open_rental {
        return Err(FleetError::VehicleUnavailable {
            vehicle_id: request.vehicle_id,
        });
    }

    Ok(RentalDraft {
        vehicle_id: request.vehicle_id,
        driver_id: request.driver_id,
        created_at: request.now,
        quote,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    const ELIGIBLE: RentalEligibility = RentalEligibility {
        vehicle_exists: true,
        driver_category: Some(LicenseCategory::A),
        vehicle_has_open_rental: false,
    };

    fn request(plan_days: u32) -> OpenRentalRequest {
        OpenRentalRequest {
            vehicle_id: VehicleId::new(100),
            driver_id: DriverId::new(200),
            plan_days,
            now: Utc.with_ymd_and_hms(2025, 3, 10, 15, 42, 7).unwrap(),
        }
    }

    fn open(plan_days: u32) -> Rental {
        open_rental(&request(plan_days), &ELIGIBLE, &RentalPricing::default())
            .unwrap()
            .into_rental(RentalId::new(1))
    }

    fn settle(plan_days: u32, offset_days: i64) -> (Rental, Settlement) {
        let mut rental = open(plan_days);
        let returned = rental.expected_end_date + Duration::days(offset_days) + Duration::hours(10);
        let settlement = rental.close(returned, &RentalPricing::default()).unwrap();
        (rental, settlement)
    }

    #[test]
    fn opened_rental_is_priced_and_open() {
        let rental = open(7);
        assert!(rental.is_open());
        assert_eq!(rental.total_value, dec!(210.00));
        assert_eq!(
            rental.start_date,
            Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap()
        );
        assert_eq!(
            rental.expected_end_date,
            Utc.with_ymd_and_hms(2025, 3, 18, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn full_term_keeps_value() {
        let (rental, settlement) = settle(7, 0);
        assert_eq!(settlement.final_value, dec!(210.00));
        assert_eq!(settlement.outcome, ReturnOutcome::OnTime);
        assert_eq!(rental.actual_end_date, Some(rental.expected_end_date));
    }

    #[test]
    fn seven_day_plan_early_return_pays_twenty_percent() {
        let (rental, settlement) = settle(7, -3);
        assert_eq!(settlement.final_value, dec!(138.00));
        assert_eq!(rental.total_value, dec!(138.00));
        assert_eq!(
            settlement.outcome,
            ReturnOutcome::Early {
                unused_days: 3,
                unused_value: dec!(90.00),
                penalty: dec!(18.00),
            }
        );
    }

    #[test]
    fn fifteen_day_plan_early_return_pays_forty_percent() {
        let (_, settlement) = settle(15, -5);
        assert_eq!(settlement.final_value, dec!(336.00));
    }

    #[test]
    fn long_plan_early_return_has_no_penalty() {
        let (_, settlement) = settle(30, -5);
        assert_eq!(settlement.final_value, dec!(550.00));
    }

    #[test]
    fn return_before_start_can_go_negative() {
        // 35 unused days at 22.00 against a 660.00 plan.
        let (_, settlement) = settle(30, -35);
        assert_eq!(settlement.final_value, dec!(-110.00));
    }

    #[test]
    fn late_return_pays_flat_surcharge() {
        let (_, settlement) = settle(7, 3);
        assert_eq!(settlement.final_value, dec!(360.00));
        assert_eq!(
            settlement.outcome,
            ReturnOutcome::Late {
                late_days: 3,
                surcharge: dec!(150.00),
            }
        );
    }

    #[test]
    fn closing_twice_is_rejected() {
        let (mut rental, _) = settle(7, 0);
        let again = rental.close(Utc::now(), &RentalPricing::default());
        assert!(matches!(again, Err(FleetError::AlreadyReturned { .. })));
        assert_eq!(rental.total_value, dec!(210.00));
    }

    #[test]
    fn invalid_plan_is_checked_first() {
        let nothing = RentalEligibility {
            vehicle_exists: false,
            driver_category: None,
            vehicle_has_open_rental: true,
        };
        let result = open_rental(&request(8), &nothing, &RentalPricing::default());
        assert!(matches!(result, Err(FleetError::InvalidPlan { plan_days: 8 })));
    }

    #[test]
    fn missing_records_are_not_found() {
        let pricing = RentalPricing::default();

        let no_vehicle = RentalEligibility {
            vehicle_exists: false,
            ..ELIGIBLE
        };
        assert!(matches!(
            open_rental(&request(7), &no_vehicle, &pricing),
            Err(FleetError::NotFound { entity: "vehicle", .. })
        ));

        let no_driver = RentalEligibility {
            driver_category: None,
            ..ELIGIBLE
        };
        assert!(matches!(
            open_rental(&request(7), &no_driver, &pricing),
            Err(FleetError::NotFound { entity: "driver", .. })
        ));
    }

    #[test]
    fn category_b_cannot_rent() {
        let car_only = RentalEligibility {
            driver_category: Some(LicenseCategory::B),
            ..ELIGIBLE
        };
        assert!(matches!(
            open_rental(&request(7), &car_only, &RentalPricing::default()),
            Err(FleetError::IneligibleDriver {
                category: LicenseCategory::B
            })
        ));
    }

    #[test]
    fn rented_vehicle_is_unavailable() {
        let rented = RentalEligibility {
            vehicle_has_open_rental: true,
            ..ELIGIBLE
        };
        assert!(matches!(
            open_rental(&request(7), &rented, &RentalPricing::default()),
            Err(FleetError::VehicleUnavailable { .. })
        ));
    }
}
