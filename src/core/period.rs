//! Calendar-month arithmetic.
//!
//! Budgets are keyed by (user, month, year) and transactions are assigned to the
//! calendar month that contains their `date`. All boundaries are computed in UTC.

use crate::errors::{Error, Result};
use chrono::{DateTime, Datelike, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MIN_YEAR: i32 = 1900;
const MAX_YEAR: i32 = 9999;

/// A validated calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Period {
    /// Calendar year
    pub year: i32,
    /// Calendar month (1-12)
    pub month: u32,
}

impl Period {
    /// Creates a period, rejecting months outside 1-12 and implausible years.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(Error::Validation {
                field: "month",
                message: format!("{month} is not between 1 and 12"),
            });
        }
        if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
            return Err(Error::Validation {
                field: "year",
                message: format!("{year} is not between {MIN_YEAR} and {MAX_YEAR}"),
            });
        }
        Ok(Self { year, month })
    }

    /// The month containing `date`
    #[must_use]
    pub fn containing(date: DateTime<Utc>) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The month containing the calendar day `day`
    #[must_use]
    pub fn of_day(day: NaiveDate) -> Self {
        Self {
            year: day.year(),
            month: day.month(),
        }
    }

    /// The month before this one
    #[must_use]
    pub const fn previous(self) -> Self {
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

    /// The month after this one
    #[must_use]
    pub const fn next(self) -> Self {
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

    /// First instant of the month
    #[must_use]
    pub fn start(self) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(self.year, self.month, 1, 0, 0, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// First instant of the following month; the month covers `[start, end_exclusive)`
    #[must_use]
    pub fn end_exclusive(self) -> DateTime<Utc> {
        self.next().start()
    }

    /// Number of days in the month
    #[must_use]
    pub fn days(self) -> u32 {
        let first = self.start().date_naive();
        let next_first = self.end_exclusive().date_naive();
        u32::try_from((next_first - first).num_days()).unwrap_or(0)
    }

    /// Whether `date` falls inside this month
    #[must_use]
    pub fn contains(self, date: DateTime<Utc>) -> bool {
        Self::containing(date) == self
    }

    /// Three-letter English month name, e.g. `"Jan"`
    #[must_use]
    pub fn short_name(self) -> String {
        self.start().format("%b").to_string()
    }
}
