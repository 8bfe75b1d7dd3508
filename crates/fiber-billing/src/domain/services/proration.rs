//! First-period proration.
//!
//! Subscribers activated mid-month owe only the remaining fraction of the
//! calendar month, charged at the package's daily rate and rounded half-up to
//! a whole currency unit. Day-based plans are never prorated.

use chrono::{Datelike, NaiveDate};
use fiber_common::Money;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::PeriodUnit;

/// Result of a proration calculation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proration {
    pub applied: bool,
    pub amount: Money,
    pub remaining_days: u32,
    pub days_in_period: u32,
}

impl Proration {
    /// Breakdown annotation, e.g. "prorata 11/30 days".
    pub fn note(&self) -> Option<String> {
        self.applied
            .then(|| format!("prorata {}/{} days", self.remaining_days, self.days_in_period))
    }
}

/// Stateless proration calculator. Callable standalone for previews.
pub struct ProrationCalculator;

impl ProrationCalculator {
    /// Compute the first-period charge fraction for an activation date.
    pub fn calculate(
        activation_date: NaiveDate,
        package_price: &Money,
        unit: PeriodUnit,
    ) -> Proration {
        if unit == PeriodUnit::Days {
            return Proration {
                applied: false,
                amount: package_price.clone(),
                remaining_days: 0,
                days_in_period: 0,
            };
        }

        let days_in_period = days_in_month(activation_date.year(), activation_date.month());
        let remaining_days = days_in_period - activation_date.day() + 1;

        if remaining_days >= days_in_period {
            // Activated on the 1st: full month, nothing to prorate.
            return Proration {
                applied: false,
                amount: package_price.clone(),
                remaining_days,
                days_in_period,
            };
        }

        let fraction = Decimal::from(remaining_days) / Decimal::from(days_in_period);
        let amount = package_price.multiply(fraction).round_to_unit();

        Proration {
            applied: true,
            amount,
            remaining_days,
            days_in_period,
        }
    }
}

/// Days in the calendar month containing the given year/month.
pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 if NaiveDate::from_ymd_opt(year, 2, 29).is_some() => 29,
        _ => 28,
    }
}
