//! Windowed aggregation and period-over-period growth on a single series.

use std::collections::BTreeMap;

use super::date::{leading_year, YearMonth};
use super::{DerivedSeries, GrowthPoint, TimeSeriesPoint};

/// Quarters in a year; the lag for year-over-year growth on quarterly data.
pub const QUARTERLY_YOY_LAG: usize = 4;

/// Months in a year; the window for annualized monthly totals.
pub const ANNUAL_WINDOW: usize = 12;

/// Points whose date key parses; anything else is treated as absent.
fn dated(points: &[TimeSeriesPoint]) -> Vec<&TimeSeriesPoint> {
    points
        .iter()
        .filter(|p| YearMonth::parse_loose(&p.date).is_some())
        .collect()
}

/// Sum of the `window` most recent values ending at each index.
///
/// Undated points are dropped first. The first `window - 1` remaining points
/// produce nothing, so the output has `len - window + 1` points (or none).
pub fn trailing_sum(points: &[TimeSeriesPoint], window: usize) -> DerivedSeries {
    if window == 0 {
        return Vec::new();
    }
    dated(points)
        .windows(window)
        .map(|w| {
            let last = w[window - 1];
            TimeSeriesPoint::new(last.date.clone(), w.iter().map(|p| p.value).sum())
        })
        .collect()
}

/// Moving average over the same windows as [`trailing_sum`].
pub fn trailing_mean(points: &[TimeSeriesPoint], window: usize) -> DerivedSeries {
    trailing_sum(points, window)
        .into_iter()
        .map(|p| TimeSeriesPoint::new(p.date, p.value / window as f64))
        .collect()
}

/// Percent change against the value `lag` periods earlier.
///
/// Undated points are dropped before lagging. Indices below `lag` are
/// omitted; a zero base yields a `None` gap.
pub fn yoy_growth(points: &[TimeSeriesPoint], lag: usize) -> Vec<GrowthPoint> {
    if lag == 0 {
        return Vec::new();
    }
    let points = dated(points);
    points
        .iter()
        .enumerate()
        .skip(lag)
        .map(|(i, point)| {
            let base = points[i - lag].value;
            let value = if base == 0.0 {
                None
            } else {
                Some((point.value - base) / base * 100.0)
            };
            GrowthPoint {
                date: point.date.clone(),
                value,
            }
        })
        .collect()
}

/// Slice a companion array (labels, raw values) to line up with
/// [`yoy_growth`] output. Only valid when every point in `items` is dated.
pub fn aligned_tail<T>(items: &[T], lag: usize) -> &[T] {
    items.get(lag..).unwrap_or(&[])
}

/// Keep points whose year lies in `[start_year, end_year]`.
pub fn filter_year_range(points: &[TimeSeriesPoint], start_year: i32, end_year: i32) -> Vec<TimeSeriesPoint> {
    points
        .iter()
        .filter(|p| {
            leading_year(&p.date)
                .map(|y| y >= start_year && y <= end_year)
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

/// For each point, the mean of all points that share its year.
pub fn annual_average_per_point(points: &[TimeSeriesPoint]) -> DerivedSeries {
    let mut groups: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for p in points {
        if let Some(year) = leading_year(&p.date) {
            let entry = groups.entry(year).or_insert((0.0, 0));
            entry.0 += p.value;
            entry.1 += 1;
        }
    }
    points
        .iter()
        .filter_map(|p| {
            let (sum, n) = groups.get(&leading_year(&p.date)?)?;
            Some(TimeSeriesPoint::new(p.date.clone(), sum / *n as f64))
        })
        .collect()
}

/// Annual counts divided by the population reported for January of the same
/// year. Years without a January population are dropped.
pub fn annual_per_capita(annual: &[TimeSeriesPoint], population: &[TimeSeriesPoint], multiplier: f64) -> DerivedSeries {
    let january: BTreeMap<i32, f64> = population
        .iter()
        .filter_map(|p| {
            let ym = p.year_month()?;
            (ym.month == 1).then_some((ym.year, p.value))
        })
        .rev()
        .collect();
    annual
        .iter()
        .filter_map(|p| {
            let year = YearMonth::parse_loose(&p.date)?.year;
            let pop = *january.get(&year)?;
            if pop == 0.0 {
                return None;
            }
            Some(TimeSeriesPoint::new(p.date.clone(), p.value / pop * multiplier))
        })
        .collect()
}

/// Unit conversion, e.g. terajoules to petajoules with `1.0 / 1000.0`.
pub fn scale(points: &[TimeSeriesPoint], factor: f64) -> DerivedSeries {
    points
        .iter()
        .map(|p| TimeSeriesPoint::new(p.date.clone(), p.value * factor))
        .collect()
}
