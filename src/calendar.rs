//! Fixed simulation calendar and hour-stamp arithmetic.
//!
//! The calendar is hard-coded: February has 28 days, April/June/September/
//! November have 30, all other months 31. There are no leap years, so every
//! simulated year spans exactly 8,760 hours and tensor offsets are constant
//! across the whole horizon.

/// Number of simulated years.
pub const YEARS: usize = 12;
/// Months per year.
pub const MONTHS: usize = 12;
/// Maximum days in any month; shorter months leave trailing cells unused.
pub const MAX_DAYS: usize = 31;
/// Hours per day.
pub const HOURS: usize = 24;

/// Total cells in a per-source operational tensor (including unused
/// cells for days beyond a month's length, which stay `Absent`).
pub const TENSOR_CELLS: usize = YEARS * MONTHS * MAX_DAYS * HOURS;

/// Valid hours in one calendar year (365 days).
pub const HOURS_PER_YEAR: usize = 365 * HOURS;

/// Days in the given month (1-based).
pub fn days_in_month(month: usize) -> usize {
    match month {
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// A position on the simulation timeline.
///
/// `year`, `month`, and `day` are 1-based; `hour` is 0-based, matching the
/// load and solar input tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HourStamp {
    pub year: usize,
    pub month: usize,
    pub day: usize,
    pub hour: usize,
}

impl HourStamp {
    /// Creates a stamp, panicking on an out-of-range coordinate.
    ///
    /// Intended for literal coordinates in tests and fixtures; the simulate
    /// loop only produces valid stamps by construction.
    pub fn new(year: usize, month: usize, day: usize, hour: usize) -> Self {
        assert!((1..=YEARS).contains(&year), "year out of range");
        assert!((1..=MONTHS).contains(&month), "month out of range");
        assert!(day >= 1 && day <= days_in_month(month), "day out of range");
        assert!(hour < HOURS, "hour out of range");
        Self {
            year,
            month,
            day,
            hour,
        }
    }

    /// First hour of the simulation horizon.
    pub fn first() -> Self {
        Self {
            year: 1,
            month: 1,
            day: 1,
            hour: 0,
        }
    }

    /// Flat index into a per-source tensor of [`TENSOR_CELLS`] cells.
    pub fn flat(&self) -> usize {
        ((self.year - 1) * MONTHS + (self.month - 1)) * MAX_DAYS * HOURS
            + (self.day - 1) * HOURS
            + self.hour
    }

    /// The next hour on the calendar, or `None` past the end of year 12.
    pub fn next(&self) -> Option<Self> {
        let mut s = *self;
        s.hour += 1;
        if s.hour < HOURS {
            return Some(s);
        }
        s.hour = 0;
        s.day += 1;
        if s.day <= days_in_month(s.month) {
            return Some(s);
        }
        s.day = 1;
        s.month += 1;
        if s.month <= MONTHS {
            return Some(s);
        }
        s.month = 1;
        s.year += 1;
        if s.year <= YEARS { Some(s) } else { None }
    }

    /// The previous hour on the calendar, or `None` at the very first hour.
    pub fn prev(&self) -> Option<Self> {
        let mut s = *self;
        if s.hour > 0 {
            s.hour -= 1;
            return Some(s);
        }
        s.hour = HOURS - 1;
        if s.day > 1 {
            s.day -= 1;
            return Some(s);
        }
        if s.month > 1 {
            s.month -= 1;
            s.day = days_in_month(s.month);
            return Some(s);
        }
        if s.year > 1 {
            s.year -= 1;
            s.month = MONTHS;
            s.day = days_in_month(s.month);
            return Some(s);
        }
        None
    }
}

/// Iterates every valid hour of the horizon in strict calendar order.
pub fn iter_hours() -> impl Iterator<Item = HourStamp> {
    let mut cursor = Some(HourStamp::first());
    std::iter::from_fn(move || {
        let current = cursor?;
        cursor = current.next();
        Some(current)
    })
}

/// Iterates every valid hour of one year in calendar order.
pub fn iter_hours_of_year(year: usize) -> impl Iterator<Item = HourStamp> {
    iter_hours().filter(move |s| s.year == year)
}
