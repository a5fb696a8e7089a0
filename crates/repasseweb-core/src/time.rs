//! Date windows for ledger filters and calendar-month helpers for revenue

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive date range used by history filters
///
/// The start is inclusive from midnight, the end is inclusive through the
/// last millisecond of the day. Bounds are interpreted in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateWindow {
    /// Create a window from optional bounds
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// First instant included by the window
    pub fn start_bound(&self) -> Option<DateTime<Utc>> {
        self.start
            .map(|d| Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)))
    }

    /// Last instant included by the window (23:59:59.999 of the end day)
    pub fn end_bound(&self) -> Option<DateTime<Utc>> {
        self.end.and_then(|d| {
            NaiveTime::from_hms_milli_opt(23, 59, 59, 999)
                .map(|t| Utc.from_utc_datetime(&d.and_time(t)))
        })
    }

    /// Check if a timestamp falls inside the window
    pub fn contains(&self, at: &DateTime<Utc>) -> bool {
        match (self.start_bound(), self.end_bound()) {
            (None, None) => true,
            (Some(s), None) => *at >= s,
            (None, Some(e)) => *at <= e,
            (Some(s), Some(e)) => *at >= s && *at <= e,
        }
    }

    /// Reject windows whose start is after their end
    pub fn is_valid(&self) -> bool {
        match (self.start, self.end) {
            (Some(s), Some(e)) => s <= e,
            _ => true,
        }
    }
}

/// Year and month of a calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

impl MonthKey {
    /// Month containing a date
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month before this one, wrapping January to December of the previous year
    pub fn previous(&self) -> Self {
        if self.month == 1 {
            Self { year: self.year - 1, month: 12 }
        } else {
            Self { year: self.year, month: self.month - 1 }
        }
    }

    /// Check if a date falls in this month
    pub fn contains(&self, date: &NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}
