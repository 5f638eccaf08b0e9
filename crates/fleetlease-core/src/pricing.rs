//! Rental pricing configuration and settlement rules.
//!
//! The pricing table is an immutable value injected into whoever needs it;
//! `RentalPricing::default()` is the reference table:
//!
//! | Plan (days) | Daily rate | Early-return penalty |
//! |-------------|-----------:|---------------------:|
//! | 7           | 30.00      | 20%                  |
//! | 15          | 28.00      | 40%                  |
//! | 30          | 22.00      | 0%                   |
//! | 45          | 20.00      | 0%                   |
//! | 50          | 18.00      | 0%                   |
//!
//! Late returns pay a flat 50.00 per extra day regardless of plan.

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{FleetError, Result};
use crate::rental::{Rental, ReturnOutcome, Settlement};

/// Flat surcharge per day returned after the expected end date.
pub const DEFAULT_LATE_FEE_PER_DAY: Decimal = dec!(50.00);

/// Terms for one plan length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanTerms {
    /// Price per day.
    pub daily_rate: Decimal,

    /// Fraction of the unused value charged on early return (0.20 = 20%).
    pub early_return_penalty: Decimal,
}

/// Pricing table keyed by plan length in days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPricing {
    /// Terms per plan length.
    pub plans: BTreeMap<u32, PlanTerms>,

    /// Surcharge per late day.
    pub late_fee_per_day: Decimal,
}

impl Default for RentalPricing {
    fn default() -> Self {
        let plans = [
            (7, dec!(30.00), dec!(0.20)),
            (15, dec!(28.00), dec!(0.40)),
            (30, dec!(22.00), Decimal::ZERO),
            (45, dec!(20.00), Decimal::ZERO),
            (50, dec!(18.00), Decimal::ZERO),
        ]
        .into_iter()
        .map(|(days, daily_rate, early_return_penalty)| {
            (
                days,
                PlanTerms {
                    daily_rate,
                    early_return_penalty,
                },
            )
        })
        .collect();

        Self {
            plans,
            late_fee_per_day: DEFAULT_LATE_FEE_PER_DAY,
        }
    }
}

/// Dates and price of a rental about to be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RentalQuote {
    /// Plan length in days.
    pub plan_days: u32,
    /// Midnight of the day after the quote instant.
    pub start_date: DateTime<Utc>,
    /// `start_date + plan_days`.
    pub expected_end_date: DateTime<Utc>,
    /// `daily_rate * plan_days`.
    pub total_value: Decimal,
}

impl RentalPricing {
    /// Look up the terms for a plan length.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::InvalidPlan` if the plan is not in the table.
    pub fn plan(&self, plan_days: u32) -> Result<&PlanTerms> {
        self.plans
            .get(&plan_days)
            .ok_or(FleetError::InvalidPlan { plan_days })
    }

    /// Available plan lengths, ascending.
    pub fn plan_lengths(&self) -> impl Iterator<Item = u32> + '_ {
        self.plans.keys().copied()
    }

    /// Price a rental opened at `now`.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::InvalidPlan` if the plan is not in the table.
    pub fn quote(&self, plan_days: u32, now: DateTime<Utc>) -> Result<RentalQuote> {
        let terms = self.plan(plan_days)?;
        let start_date = midnight(now) + Duration::days(1);
        Ok(RentalQuote {
            plan_days,
            start_date,
            expected_end_date: start_date + Duration::days(i64::from(plan_days)),
            total_value: terms.daily_rate * Decimal::from(plan_days),
        })
    }

    /// Compute the settlement of `rental` returned at `actual_end`.
    ///
    /// Only the calendar day of `actual_end` matters. The final value is
    /// not clamped: a return long before the expected end can make it
    /// negative.
    ///
    /// # Errors
    ///
    /// - `FleetError::AlreadyReturned` if the rental is closed.
    /// - `FleetError::InvalidPlan` if the rental's plan is no longer priced.
    pub fn settle(&self, rental: &Rental, actual_end: DateTime<Utc>) -> Result<Settlement> {
        if let Some(returned_on) = rental.actual_end_date {
            return Err(FleetError::AlreadyReturned {
                rental_id: rental.id,
                returned_on,
            });
        }

        let terms = self.plan(rental.plan_days)?;
        let actual_end_date = midnight(actual_end);
        let delta = actual_end_date
            .date_naive()
            .signed_duration_since(rental.expected_end_date.date_naive())
            .num_days();

        let (outcome, final_value) = match delta {
            d if d < 0 => {
                let unused_days = -d;
                let unused_value = terms.daily_rate * Decimal::from(unused_days);
                let penalty = unused_value * terms.early_return_penalty;
                (
                    ReturnOutcome::Early {
                        unused_days,
                        unused_value,
                        penalty,
                    },
                    rental.total_value - unused_value + penalty,
                )
            }
            d if d > 0 => {
                let surcharge = self.late_fee_per_day * Decimal::from(d);
                (
                    ReturnOutcome::Late {
                        late_days: d,
                        surcharge,
                    },
                    rental.total_value + surcharge,
                )
            }
            _ => (ReturnOutcome::OnTime, rental.total_value),
        };

        Ok(Settlement {
            rental_id: rental.id,
            actual_end_date,
            base_value: rental.total_value,
            final_value,
            outcome,
        })
    }
}

/// Midnight (UTC) of the calendar day containing `instant`.
#[must_use]
pub fn midnight(instant: DateTime<Utc>) -> DateTime<Utc> {
    Utc.from_utc_datetime(&instant.date_naive().and_time(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_matches_reference() {
        let pricing = RentalPricing::default();
        assert_eq!(pricing.plan_lengths().collect::<Vec<_>>(), vec![7, 15, 30, 45, 50]);
        assert_eq!(pricing.plan(7).unwrap().daily_rate, dec!(30.00));
        assert_eq!(pricing.plan(50).unwrap().daily_rate, dec!(18.00));
        assert_eq!(pricing.late_fee_per_day, dec!(50.00));
    }

    #[test]
    fn unknown_plan_is_rejected() {
        let pricing = RentalPricing::default();
        assert!(matches!(
            pricing.plan(10),
            Err(FleetError::InvalidPlan { plan_days: 10 })
        ));
    }

    #[test]
    fn quote_starts_next_midnight_regardless_of_time_of_day() {
        let pricing = RentalPricing::default();
        let expected_start = Utc.with_ymd_and_hms(2025, 3, 11, 0, 0, 0).unwrap();

        for (h, m, s) in [(0, 0, 0), (9, 30, 15), (23, 59, 59)] {
            let now = Utc.with_ymd_and_hms(2025, 3, 10, h, m, s).unwrap();
            let quote = pricing.quote(7, now).unwrap();
            assert_eq!(quote.start_date, expected_start);
            assert_eq!(
                quote.expected_end_date,
                Utc.with_ymd_and_hms(2025, 3, 18, 0, 0, 0).unwrap()
            );
        }
    }

    #[test]
    fn quote_totals() {
        let pricing = RentalPricing::default();
        let now = Utc.with_ymd_and_hms(2025, 1, 31, 12, 0, 0).unwrap();
        assert_eq!(pricing.quote(7, now).unwrap().total_value, dec!(210.00));
        assert_eq!(pricing.quote(15, now).unwrap().total_value, dec!(420.00));
        assert_eq!(pricing.quote(30, now).unwrap().total_value, dec!(660.00));
        assert_eq!(pricing.quote(45, now).unwrap().total_value, dec!(900.00));
        assert_eq!(pricing.quote(50, now).unwrap().total_value, dec!(900.00));
    }

    #[test]
    fn pricing_loads_from_json() {
        let json = r#"{
            "plans": { "10": { "daily_rate": "25.00", "early_return_penalty": "0.10" } },
            "late_fee_per_day": "40.00"
        }"#;
        let pricing: RentalPricing = serde_json::from_str(json).unwrap();
        assert_eq!(pricing.plan(10).unwrap().daily_rate, dec!(25.00));
        assert!(pricing.plan(7).is_err());
    }
}
