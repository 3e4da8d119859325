//! Calendar periods used for reporting and ledger queries.
//!
//! Reports cover one calendar month. Ledger windows are half-open
//! `[start, end)` so consecutive months never share a day.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised when building periods and date ranges.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    /// Month outside 1-12 or year outside the supported calendar.
    #[error("Invalid report period {year}-{month}")]
    InvalidPeriod {
        /// Requested year.
        year: i32,
        /// Requested month.
        month: u32,
    },

    /// Range start is after its end.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date (exclusive).
        end: NaiveDate,
    },
}

/// A half-open date range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Creates a range covering `start` up to but excluding `end`.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::InvalidDateRange` if `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, PeriodError> {
        if start > end {
            return Err(PeriodError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// First day included in the range.
    #[must_use]
    pub const fn start(&self) -> NaiveDate {
        self.start
    }

    /// First day after the range.
    #[must_use]
    pub const fn end(&self) -> NaiveDate {
        self.end
    }

    /// January 1 of `date`'s year through `date` inclusive.
    #[must_use]
    pub fn year_through(date: NaiveDate) -> Self {
        Self {
            start: NaiveDate::from_yo_opt(date.year(), 1).unwrap_or(date),
            end: date.succ_opt().unwrap_or(NaiveDate::MAX),
        }
    }

    /// Returns true if `date` falls inside the range.
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date < self.end
    }
}

/// One calendar month for a compliance report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ReportPeriod {
    year: i32,
    month: u32,
}

impl ReportPeriod {
    /// Creates a period for `month` (1-12) of `year`.
    ///
    /// # Errors
    ///
    /// Returns `PeriodError::InvalidPeriod` for an out-of-range month or year.
    pub fn new(year: i32, month: u32) -> Result<Self, PeriodError> {
        if NaiveDate::from_ymd_opt(year, month, 1).is_none()
            || NaiveDate::from_ymd_opt(year + 1, 1, 1).is_none()
        {
            return Err(PeriodError::InvalidPeriod { year, month });
        }
        Ok(Self { year, month })
    }

    /// The period containing `date`.
    #[must_use]
    pub fn containing(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar year.
    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Calendar month (1-12).
    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }

    /// First day of the month.
    #[must_use]
    pub fn start(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// First day of the following month.
    #[must_use]
    pub fn end(&self) -> NaiveDate {
        self.next().start()
    }

    /// The month as a half-open date range.
    #[must_use]
    pub fn date_range(&self) -> DateRange {
        DateRange {
            start: self.start(),
            end: self.end(),
        }
    }

    /// January 1 of the period's year up to the start of this month.
    #[must_use]
    pub fn year_to_date(&self) -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(self.year, 1, 1).unwrap_or(NaiveDate::MIN),
            end: self.start(),
        }
    }

    /// The preceding month.
    #[must_use]
    pub const fn previous(&self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// The following month.
    #[must_use]
    pub const fn next(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(2026, 0)]
    #[case(2026, 13)]
    fn test_invalid_month_rejected(#[case] year: i32, #[case] month: u32) {
        assert_eq!(
            ReportPeriod::new(year, month),
            Err(PeriodError::InvalidPeriod { year, month })
        );
    }

    #[test]
    fn test_month_bounds() {
        let period = ReportPeriod::new(2026, 2).unwrap();
        assert_eq!(period.start(), date(2026, 2, 1));
        assert_eq!(period.end(), date(2026, 3, 1));
        assert!(period.date_range().contains(date(2026, 2, 28)));
        assert!(!period.date_range().contains(date(2026, 3, 1)));
    }

    #[test]
    fn test_year_rollover() {
        let january = ReportPeriod::new(2026, 1).unwrap();
        assert_eq!(january.previous(), ReportPeriod::new(2025, 12).unwrap());
        let december = ReportPeriod::new(2025, 12).unwrap();
        assert_eq!(december.next(), january);
        assert_eq!(december.end(), date(2026, 1, 1));
    }

    #[test]
    fn test_year_to_date_excludes_current_month() {
        let period = ReportPeriod::new(2026, 4).unwrap();
        let ytd = period.year_to_date();
        assert_eq!(ytd.start(), date(2026, 1, 1));
        assert_eq!(ytd.end(), date(2026, 4, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(ReportPeriod::new(2026, 3).unwrap().to_string(), "2026-03");
    }

    #[test]
    fn test_year_through_includes_the_day() {
        let range = DateRange::year_through(date(2026, 5, 14));
        assert_eq!(range.start(), date(2026, 1, 1));
        assert!(range.contains(date(2026, 5, 14)));
        assert!(!range.contains(date(2026, 5, 15)));
        assert!(!range.contains(date(2025, 12, 31)));
    }

    #[test]
    fn test_date_range_rejects_inverted_bounds() {
        assert!(DateRange::new(date(2026, 2, 1), date(2026, 1, 1)).is_err());
        assert!(DateRange::new(date(2026, 1, 1), date(2026, 1, 1)).is_ok());
    }
}
