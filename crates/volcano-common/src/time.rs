//! Calendar-day handling for acquisitions and retention.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, MonitorResult};

/// Format used in file names, ledger rows and catalog queries.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a strict `YYYY-MM-DD` date.
pub fn parse_date(s: &str) -> MonitorResult<NaiveDate> {
    if s.len() != 10 {
        return Err(MonitorError::InvalidConfig(format!("invalid date '{}'", s)));
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map_err(|e| MonitorError::InvalidConfig(format!("invalid date '{}': {}", s, e)))
}

/// Take the leading calendar day of an ISO 8601 timestamp ("2025-06-01T14:03:11Z").
pub fn date_prefix(timestamp: &str) -> Option<NaiveDate> {
    let head = timestamp.get(..10)?;
    NaiveDate::parse_from_str(head, DATE_FORMAT).ok()
}

/// Oldest date a retention horizon keeps: `now - horizon_days`.
///
/// Assets dated strictly before the cutoff are expired.
pub fn retention_cutoff(now: NaiveDate, horizon_days: u32) -> NaiveDate {
    now - Duration::days(horizon_days as i64)
}

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> MonitorResult<Self> {
        if start > end {
            return Err(MonitorError::InvalidConfig(format!(
                "date range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// The `days` days ending at (and including) `end`, starting `days` before it.
    pub fn trailing(end: NaiveDate, days: u32) -> Self {
        Self {
            start: end - Duration::days(days as i64),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}
