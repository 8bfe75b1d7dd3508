//! Route handlers

pub mod billing;
pub mod health;
pub mod subscribers;
pub mod suspension;

use fiber_billing::{BillingType, PeriodUnit};

pub(crate) fn parse_period_unit(raw: Option<&str>) -> PeriodUnit {
    match raw {
        Some("days") => PeriodUnit::Days,
        _ => PeriodUnit::Months,
    }
}

pub(crate) fn parse_billing_type(raw: Option<&str>) -> BillingType {
    match raw {
        Some("postpaid") => BillingType::Postpaid,
        _ => BillingType::Prepaid,
    }
}
