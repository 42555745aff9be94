//! Chart-ready time-series derivations.
//!
//! All functions here are pure: they take slices, return fresh vectors and
//! never error. Points with unusable dates or denominators are dropped.

pub mod aligner;
pub mod date;
pub mod labels;
pub mod window;

use serde::{Deserialize, Serialize};

pub use aligner::{calculate_per_capita, common_dates, per_capita, ratio_exact, subtract_exact, PopulationIndex};
pub use date::YearMonth;
pub use window::{trailing_mean, trailing_sum, yoy_growth};

/// One observation keyed by `"YYYY-MM"` (or a bare year for annual data).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: String,
    pub value: f64,
}

impl TimeSeriesPoint {
    pub fn new(date: impl Into<String>, value: f64) -> Self {
        Self {
            date: date.into(),
            value,
        }
    }

    pub fn year_month(&self) -> Option<YearMonth> {
        YearMonth::parse(&self.date)
    }
}

/// Output of a derivation; never longer than its input.
pub type DerivedSeries = Vec<TimeSeriesPoint>;

/// Growth value at a date; `None` renders as a gap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthPoint {
    pub date: String,
    pub value: Option<f64>,
}

/// Build points from raw `[date, value]` tuples.
pub fn from_raw<S: AsRef<str>>(raw: &[(S, f64)]) -> Vec<TimeSeriesPoint> {
    raw.iter()
        .map(|(date, value)| TimeSeriesPoint::new(date.as_ref(), *value))
        .collect()
}

pub fn values(points: &[TimeSeriesPoint]) -> Vec<f64> {
    points.iter().map(|p| p.value).collect()
}

pub fn dates(points: &[TimeSeriesPoint]) -> Vec<String> {
    points.iter().map(|p| p.date.clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_preserves_order() {
        let pts = from_raw(&[("2024-02", 2.0), ("2024-01", 1.0)]);
        assert_eq!(dates(&pts), vec!["2024-02", "2024-01"]);
        assert_eq!(values(&pts), vec![2.0, 1.0]);
        assert_eq!(pts[1].year_month(), YearMonth::new(2024, 1));
    }
}
