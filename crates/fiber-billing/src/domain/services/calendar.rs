//! Business-timezone calendar rules.
//!
//! All billing calendar facts live here: the grace window (1st through 5th),
//! the invoice due day (5th at midnight) and the suspension day (6th). The
//! business runs in a single fixed-offset timezone; instants are stored UTC
//! and converted at the edges.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};

use super::proration::days_in_month;

/// Last day of the grace window, inclusive.
pub const GRACE_END_DAY: u32 = 5;
/// Day of month invoices fall due, at business midnight.
pub const DUE_DAY: u32 = 5;
/// Day of month the suspension engine is allowed to act.
pub const SUSPENSION_DAY: u32 = 6;

/// Calendar math in the business timezone
#[derive(Clone, Copy, Debug)]
pub struct BillingCalendar {
    offset: FixedOffset,
}

impl BillingCalendar {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Business offset in whole hours east of UTC, e.g. 7 for WIB.
    pub fn with_offset_hours(hours: i32) -> Self {
        let offset = FixedOffset::east_opt(hours * 3600).unwrap_or_else(|| Utc.fix());
        Self { offset }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The business-timezone calendar date of the given instant.
    pub fn business_date(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.offset).date_naive()
    }

    /// Whether the given instant falls on the suspension day.
    pub fn is_suspension_day(&self, now: DateTime<Utc>) -> bool {
        self.business_date(now).day() == SUSPENSION_DAY
    }

    /// The next date the suspension engine will act, from the given instant.
    pub fn next_suspension_run(&self, now: DateTime<Utc>) -> NaiveDate {
        let today = self.business_date(now);
        if today.day() < SUSPENSION_DAY {
            with_day(today, SUSPENSION_DAY)
        } else {
            with_day(first_of_next_month(today), SUSPENSION_DAY)
        }
    }

    /// Calendar month window containing `date`:
    /// [1st 00:00:00, last day 23:59:59] business time, as UTC instants.
    pub fn month_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let first = with_day(date, 1);
        let last = with_day(date, days_in_month(date.year(), date.month()));
        (self.start_of_day(first), self.end_of_day(last))
    }

    /// Grace-period window of the month containing `date`:
    /// [1st 00:00:00, 5th 23:59:59] business time, as UTC instants.
    pub fn grace_window(&self, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let first = with_day(date, 1);
        let grace_end = with_day(date, GRACE_END_DAY);
        (self.start_of_day(first), self.end_of_day(grace_end))
    }

    /// Invoice due date for the month containing `date`: the 5th at business
    /// midnight.
    pub fn due_date(&self, date: NaiveDate) -> DateTime<Utc> {
        self.start_of_day(with_day(date, DUE_DAY))
    }

    /// First calendar day of the month after the one containing `date`.
    pub fn first_of_next_month(&self, date: NaiveDate) -> NaiveDate {
        first_of_next_month(date)
    }

    /// The 1st and last day of the calendar month containing `date`.
    pub fn month_bounds(&self, date: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            with_day(date, 1),
            with_day(date, days_in_month(date.year(), date.month())),
        )
    }

    fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_utc(date.and_time(NaiveTime::MIN))
    }

    fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.to_utc((date + Duration::days(1)).and_time(NaiveTime::MIN)) - Duration::seconds(1)
    }

    fn to_utc(&self, local: chrono::NaiveDateTime) -> DateTime<Utc> {
        (local - Duration::seconds(i64::from(self.offset.local_minus_utc()))).and_utc()
    }
}

impl Default for BillingCalendar {
    /// Western Indonesia Time (UTC+7).
    fn default() -> Self {
        Self::with_offset_hours(7)
    }
}

fn with_day(date: NaiveDate, day: u32) -> NaiveDate {
    date.with_day(day).unwrap_or(date)
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}
