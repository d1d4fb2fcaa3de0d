//! Week arithmetic shared by the resolver and the store.
//!
//! Dates are plain [`NaiveDate`]s; everything here reasons in whole
//! calendar days. Weeks run Monday through Sunday.

use chrono::{Datelike, Days, NaiveDate};

/// Calendar-day arithmetic; `n` may be negative.
pub fn add_days(d: NaiveDate, n: i64) -> NaiveDate {
    if n >= 0 {
        d + Days::new(n as u64)
    } else {
        d - Days::new(n.unsigned_abs())
    }
}

/// Weekday index in the 0 = Sunday .. 6 = Saturday scheme.
pub fn weekday_index(d: NaiveDate) -> u32 {
    d.weekday().num_days_from_sunday()
}

/// The Monday at or before `d`.
pub fn start_of_week(d: NaiveDate) -> NaiveDate {
    d - Days::new(d.weekday().num_days_from_monday() as u64)
}

/// Nearest occurrence of `weekday` (0 = Sunday .. 6 = Saturday) on or
/// after `base`; `base` itself when it already falls on that day.
pub fn nearest_weekday(base: NaiveDate, weekday: u32) -> NaiveDate {
    let diff = (weekday + 7 - weekday_index(base)) % 7;
    base + Days::new(diff as u64)
}

/// Whether `a` and `b` share a Monday-to-Sunday week.
pub fn is_same_week(a: NaiveDate, b: NaiveDate) -> bool {
    start_of_week(a) == start_of_week(b)
}

/// Whether `d` falls in the week after the one containing `base`.
pub fn is_next_week(d: NaiveDate, base: NaiveDate) -> bool {
    WeekWindow::next(base).contains(d)
}

/// A Monday-to-Sunday span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekWindow {
    start: NaiveDate,
    end: NaiveDate,
}

impl WeekWindow {
    /// The week containing `base`.
    pub fn current(base: NaiveDate) -> Self {
        let start = start_of_week(base);
        Self { start, end: start + Days::new(6) }
    }

    /// The week after the one containing `base`.
    pub fn next(base: NaiveDate) -> Self {
        let start = start_of_week(base) + Days::new(7);
        Self { start, end: start + Days::new(6) }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive on both ends.
    pub fn contains(&self, d: NaiveDate) -> bool {
        d >= self.start && d <= self.end
    }
}
