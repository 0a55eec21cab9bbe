/// Calendar date ranges
///
/// Stays are half-open intervals `[start, end)`: the guest arrives on `start` and leaves
/// on `end`, so a stay ending on the 3rd and another starting on the 3rd do not collide.
///
/// # Example
///
/// ```
/// use hearth_shared::dates::DateRange;
///
/// let booked = DateRange::parse("2050-01-01", "2050-01-03").unwrap();
/// let wanted = DateRange::parse("2050-01-03", "2050-01-05").unwrap();
/// assert!(!booked.overlaps(&wanted));
/// ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date format used by every form and URL in the site
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Error type for date parsing
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateRangeError {
    /// A value was not a `YYYY-MM-DD` calendar date
    #[error("invalid date: {0:?}")]
    InvalidDate(String),

    /// End date is on or before the start date
    #[error("end date {end} must be after start date {start}")]
    EmptyRange { start: NaiveDate, end: NaiveDate },
}

/// Parses a single `YYYY-MM-DD` date
pub fn parse_date(value: &str) -> Result<NaiveDate, DateRangeError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT)
        .map_err(|_| DateRangeError::InvalidDate(value.to_string()))
}

/// Returns true when `[s1, e1)` and `[s2, e2)` share at least one day
pub fn overlaps(s1: NaiveDate, e1: NaiveDate, s2: NaiveDate, e2: NaiveDate) -> bool {
    s1 < e2 && s2 < e1
}

/// A non-empty half-open date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `end <= start`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateRangeError> {
        if start >= end {
            return Err(DateRangeError::EmptyRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Parses both ends from `YYYY-MM-DD` strings
    pub fn parse(start: &str, end: &str) -> Result<Self, DateRangeError> {
        Self::new(parse_date(start)?, parse_date(end)?)
    }

    /// Whether the two ranges share at least one night
    pub fn overlaps(&self, other: &DateRange) -> bool {
        overlaps(self.start, self.end, other.start, other.end)
    }

    /// Number of nights in the stay
    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}
