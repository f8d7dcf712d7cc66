//! Calendar dates in the two textual forms used by the pipeline: DSSAT ordinal
//! dates (`YYYYDDD`) and request dates (`YYYYMMDD`).

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DateError {
    #[error("'{0}' is not an ordinal date (expected YYYYDDD)")]
    InvalidOrdinal(String),

    #[error("'{0}' is not a calendar date (expected YYYYMMDD)")]
    InvalidCalendar(String),

    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

/// A day written as 4-digit year followed by 3-digit day-of-year, e.g. `2023100`.
///
/// Ordering follows the calendar, so sorted ordinal dates are chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrdinalDate(NaiveDate);

impl OrdinalDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn from_yo(year: i32, ordinal: u32) -> Option<Self> {
        NaiveDate::from_yo_opt(year, ordinal).map(Self)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// The following calendar day.
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add_days(Days::new(1)).map(Self)
    }

    /// The preceding calendar day.
    pub fn previous(&self) -> Option<Self> {
        self.0.checked_sub_days(Days::new(1)).map(Self)
    }
}

impl From<NaiveDate> for OrdinalDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for OrdinalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}{:03}", self.0.year(), self.0.ordinal())
    }
}

impl FromStr for OrdinalDate {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DateError::InvalidOrdinal(s.to_string());
        let s = s.trim();
        if s.len() != 7 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let year: i32 = s[..4].parse().map_err(|_| invalid())?;
        let ordinal: u32 = s[4..].parse().map_err(|_| invalid())?;
        Self::from_yo(year, ordinal).ok_or_else(invalid)
    }
}

/// Parses a `YYYYMMDD` date as accepted on the command line.
pub fn parse_calendar_date(s: &str) -> Result<NaiveDate, DateError> {
    let invalid = || DateError::InvalidCalendar(s.to_string());
    let s = s.trim();
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let year: i32 = s[..4].parse().map_err(|_| invalid())?;
    let month: u32 = s[4..6].parse().map_err(|_| invalid())?;
    let day: u32 = s[6..].parse().map_err(|_| invalid())?;
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// An inclusive range of days requested from the data providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateError> {
        if start > end {
            return Err(DateError::InvertedRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// `YYYYMMDD` form of the start date, as sent to the point API.
    pub fn start_param(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    /// `YYYYMMDD` form of the end date, as sent to the point API.
    pub fn end_param(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start_param(), self.end_param())
    }
}
