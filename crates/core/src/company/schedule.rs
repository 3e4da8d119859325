//! Per-company report generation schedule.
//!
//! An external trigger polls hourly; a schedule is due during its slot hour
//! and asks for the calendar month that just closed.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::company::error::CompanyError;
use crate::period::ReportPeriod;

/// How often a company's report is generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cadence", rename_all = "snake_case")]
pub enum ReportCadence {
    /// Once a month on the given day (1-28).
    Monthly {
        /// Day of the month.
        day_of_month: u32,
    },
    /// Once a week on the given weekday.
    Weekly {
        /// Day of the week.
        weekday: Weekday,
    },
}

/// When a company's report is generated automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSchedule {
    /// Cadence.
    pub cadence: ReportCadence,
    /// Hour of day in UTC (0-23).
    pub hour_utc: u32,
}

impl ReportSchedule {
    /// Checks field ranges.
    pub fn validate(&self) -> Result<(), CompanyError> {
        if let ReportCadence::Monthly { day_of_month } = self.cadence
            && !(1..=28).contains(&day_of_month)
        {
            return Err(CompanyError::InvalidSchedule(format!(
                "day_of_month must be between 1 and 28, got {day_of_month}"
            )));
        }
        if self.hour_utc > 23 {
            return Err(CompanyError::InvalidSchedule(format!(
                "hour_utc must be between 0 and 23, got {}",
                self.hour_utc
            )));
        }
        Ok(())
    }

    /// Returns true if `now` falls in the scheduled hour.
    #[must_use]
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        let day_matches = match self.cadence {
            ReportCadence::Monthly { day_of_month } => now.day() == day_of_month,
            ReportCadence::Weekly { weekday } => now.weekday() == weekday,
        };
        day_matches && now.hour() == self.hour_utc
    }

    /// The period a run at `now` reports on: the previous calendar month.
    #[must_use]
    pub fn period_for(now: DateTime<Utc>) -> ReportPeriod {
        ReportPeriod::containing(now.date_naive()).previous()
    }
}
