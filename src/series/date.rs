//! Calendar-month parsing and timestamp normalization.
//!
//! Statistical datasets key observations by `"YYYY-MM"` or bare years, while
//! the promise API mixes RFC 3339 strings, bare dates and serialized Firestore
//! timestamps. Everything here fails closed: bad input yields `None`.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A calendar month. Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// Strict `"YYYY-MM"`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut parts = s.trim().split('-');
        let year = parse_year(parts.next()?)?;
        let month = parts.next()?.trim().parse::<u32>().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(year, month)
    }

    /// `"YYYY-MM"` or a bare year (mapped to January).
    pub fn parse_loose(s: &str) -> Option<Self> {
        Self::parse(s).or_else(|| Self::new(parse_year(s)?, 1))
    }

    pub fn from_epoch_secs(secs: i64) -> Option<Self> {
        let dt = Utc.timestamp_opt(secs, 0).single()?;
        Self::new(dt.year(), dt.month())
    }

    /// UTC milliseconds at 00:00 on the first day of the month.
    pub fn first_of_month_millis(&self) -> Option<i64> {
        let naive = NaiveDate::from_ymd_opt(self.year, self.month, 1)?.and_hms_opt(0, 0, 0)?;
        Some(Utc.from_utc_datetime(&naive).timestamp_millis())
    }

    /// Signed number of months from `self` to `other`.
    pub fn months_until(&self, other: YearMonth) -> i64 {
        (other.year as i64 - self.year as i64) * 12 + (other.month as i64 - self.month as i64)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn parse_year(s: &str) -> Option<i32> {
    let s = s.trim();
    if s.is_empty() || !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Leading year of a `"YYYY-MM"` / `"YYYY"` date key.
pub fn leading_year(date: &str) -> Option<i32> {
    parse_year(date.split('-').next()?)
}

/// Serialized Firestore timestamp as it arrives over JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirestoreTimestamp {
    #[serde(alias = "_seconds")]
    pub seconds: i64,
    #[serde(alias = "_nanoseconds")]
    pub nanoseconds: i64,
}

/// Any date shape the API or datasets emit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateInput {
    Firestore(FirestoreTimestamp),
    Text(String),
    Year(i64),
}

impl DateInput {
    pub fn to_millis(&self) -> Option<i64> {
        match self {
            DateInput::Firestore(ts) => ts
                .seconds
                .checked_mul(1000)?
                .checked_add(ts.nanoseconds.div_euclid(1_000_000)),
            DateInput::Text(s) => parse_timestamp_millis(s),
            DateInput::Year(y) => YearMonth::new(i32::try_from(*y).ok()?, 1)?.first_of_month_millis(),
        }
    }

    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.to_millis()?).single()
    }

    /// "May 27, 2025", or a placeholder when the input can't be read.
    pub fn format_long(&self) -> String {
        if let DateInput::Text(s) = self {
            if s.trim().is_empty() {
                return "Date not available".to_string();
            }
        }
        match self.to_datetime() {
            Some(dt) => dt.format("%B %-d, %Y").to_string(),
            None => "Invalid date".to_string(),
        }
    }
}

pub fn format_long(date: Option<&DateInput>) -> String {
    date.map(DateInput::format_long)
        .unwrap_or_else(|| "Date not available".to_string())
}

/// Milliseconds since the epoch for an ISO-ish date string.
///
/// Accepts RFC 3339, naive datetimes (taken as UTC), `YYYY-MM-DD`, `YYYY-MM`
/// and bare years.
pub fn parse_timestamp_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive).timestamp_millis());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?).timestamp_millis());
    }
    YearMonth::parse_loose(s)?.first_of_month_millis()
}
