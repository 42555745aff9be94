//! Per-capita derivation across mismatched sampling.
//!
//! The denominator series is indexed once, sorted by month. For each metric
//! month the population is taken from an exact match, a linear interpolation
//! between the neighbouring months, or the single available neighbour.

use std::collections::{HashMap, HashSet};

use super::date::YearMonth;
use super::{from_raw, DerivedSeries, TimeSeriesPoint};

/// Neighbours of a target month in the denominator series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbors {
    /// Latest point at or before the target.
    pub before: Option<(YearMonth, f64)>,
    /// Earliest point strictly after the target.
    pub after: Option<(YearMonth, f64)>,
}

/// Denominator series sorted ascending by month.
#[derive(Debug, Clone, Default)]
pub struct PopulationIndex {
    points: Vec<(YearMonth, f64)>,
}

impl PopulationIndex {
    /// Unparseable dates are skipped. Sorting is stable, so duplicate months
    /// keep input order.
    pub fn new(series: &[TimeSeriesPoint]) -> Self {
        let mut points: Vec<(YearMonth, f64)> = series
            .iter()
            .filter_map(|p| Some((p.year_month()?, p.value)))
            .collect();
        points.sort_by_key(|(ym, _)| *ym);
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn neighbors(&self, target: YearMonth) -> Neighbors {
        let split = self.points.partition_point(|(ym, _)| *ym <= target);
        let before = split.checked_sub(1).map(|last| {
            // First of any run of duplicates wins.
            let month = self.points[last].0;
            self.points[self.points.partition_point(|(ym, _)| *ym < month)]
        });
        Neighbors {
            before,
            after: self.points.get(split).copied(),
        }
    }

    /// Denominator at `target`, or `None` when the index is empty.
    pub fn value_at(&self, target: YearMonth) -> Option<f64> {
        let Neighbors { before, after } = self.neighbors(target);
        match (before, after) {
            (Some((month, value)), _) if month == target => Some(value),
            (Some(b), Some(a)) => interpolate(target, b, a).or(Some(b.1)),
            (Some((_, value)), None) | (None, Some((_, value))) => Some(value),
            (None, None) => None,
        }
    }
}

/// Straight line between `before` and `after`, on first-of-month millisecond
/// timestamps.
pub fn interpolate(target: YearMonth, before: (YearMonth, f64), after: (YearMonth, f64)) -> Option<f64> {
    let t = target.first_of_month_millis()? as f64;
    let t0 = before.0.first_of_month_millis()? as f64;
    let t1 = after.0.first_of_month_millis()? as f64;
    let span = t1 - t0;
    if span == 0.0 {
        return None;
    }
    Some(before.1 + (after.1 - before.1) * ((t - t0) / span))
}

/// `metric / population × multiplier` for every metric point that has a
/// usable, non-zero denominator. Output keeps metric order.
pub fn per_capita(metric: &[TimeSeriesPoint], population: &[TimeSeriesPoint], multiplier: f64) -> DerivedSeries {
    let index = PopulationIndex::new(population);
    metric
        .iter()
        .filter_map(|point| {
            let month = point.year_month()?;
            let denominator = index.value_at(month)?;
            if denominator == 0.0 || !denominator.is_finite() {
                return None;
            }
            Some(TimeSeriesPoint::new(
                point.date.clone(),
                point.value / denominator * multiplier,
            ))
        })
        .collect()
}

/// Per-capita from raw `[date, value]` tuples as found in dataset files.
pub fn calculate_per_capita<S: AsRef<str>>(metric_raw: &[(S, f64)], population_raw: &[(S, f64)], multiplier: f64) -> DerivedSeries {
    per_capita(&from_raw(metric_raw), &from_raw(population_raw), multiplier)
}

/// Dated points keyed by their exact date string. Later duplicates overwrite
/// earlier ones.
fn exact_lookup(points: &[TimeSeriesPoint]) -> HashMap<&str, f64> {
    points
        .iter()
        .filter(|p| YearMonth::parse_loose(&p.date).is_some())
        .map(|p| (p.date.trim(), p.value))
        .collect()
}

/// `numerator / denominator × multiplier` on identical date keys only.
///
/// Unlike [`per_capita`] nothing is interpolated: a numerator point with no
/// same-date denominator, or a zero or non-finite one, is dropped.
pub fn ratio_exact(numerator: &[TimeSeriesPoint], denominator: &[TimeSeriesPoint], multiplier: f64) -> DerivedSeries {
    let lookup = exact_lookup(denominator);
    numerator
        .iter()
        .filter_map(|point| {
            let denom = *lookup.get(point.date.trim())?;
            if denom == 0.0 || !denom.is_finite() {
                return None;
            }
            Some(TimeSeriesPoint::new(point.date.clone(), point.value / denom * multiplier))
        })
        .collect()
}

/// `minuend - subtrahend` on identical date keys; unmatched dates are dropped.
pub fn subtract_exact(minuend: &[TimeSeriesPoint], subtrahend: &[TimeSeriesPoint]) -> DerivedSeries {
    let lookup = exact_lookup(subtrahend);
    minuend
        .iter()
        .filter_map(|point| {
            let other = *lookup.get(point.date.trim())?;
            Some(TimeSeriesPoint::new(point.date.clone(), point.value - other))
        })
        .collect()
}

/// Dates present in every series, in the order of the first one.
pub fn common_dates(series: &[&[TimeSeriesPoint]]) -> Vec<String> {
    let Some((first, rest)) = series.split_first() else {
        return Vec::new();
    };
    let others: Vec<HashSet<&str>> = rest
        .iter()
        .map(|s| s.iter().map(|p| p.date.trim()).collect())
        .collect();
    let mut seen = HashSet::new();
    first
        .iter()
        .map(|p| p.date.trim())
        .filter(|date| YearMonth::parse_loose(date).is_some())
        .filter(|date| others.iter().all(|set| set.contains(date)))
        .filter(|date| seen.insert(*date))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ym(s: &str) -> YearMonth {
        YearMonth::parse(s).unwrap()
    }

    fn pts(raw: &[(&str, f64)]) -> Vec<TimeSeriesPoint> {
        from_raw(raw)
    }

    #[test]
    fn exact_match_divides_exactly() {
        let metric = pts(&[("2024-01", 1000.0)]);
        let pop = pts(&[("2023-12", 7.0), ("2024-01", 3.0), ("2024-02", 11.0)]);
        let out = per_capita(&metric, &pop, 1.0);
        assert_eq!(out, vec![TimeSeriesPoint::new("2024-01", 1000.0 / 3.0)]);
    }

    #[test]
    fn interpolates_midpoint_month() {
        // July and August both have 31 days, so August 1st is the exact midpoint.
        let metric = pts(&[("2023-08", 300.0)]);
        let pop = pts(&[("2023-07", 100.0), ("2023-09", 200.0)]);
        let out = per_capita(&metric, &pop, 1.0);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].value, 2.0);
    }

    #[test]
    fn interpolation_weights_by_timestamp() {
        let index = PopulationIndex::new(&pts(&[("2024-01", 0.0), ("2024-04", 91.0)]));
        // Jan 31 + Feb 29 days into a 91-day span.
        let v = index.value_at(ym("2024-03")).unwrap();
        assert!((v - 60.0).abs() < 1e-9);
    }

    #[test]
    fn falls_back_to_single_neighbour() {
        let index = PopulationIndex::new(&pts(&[("2024-06", 50.0), ("2024-09", 80.0)]));
        assert_eq!(index.value_at(ym("2024-01")), Some(50.0));
        assert_eq!(index.value_at(ym("2025-01")), Some(80.0));
    }

    #[test]
    fn unsorted_population_is_indexed() {
        let index = PopulationIndex::new(&pts(&[("2024-09", 80.0), ("bad", 1.0), ("2024-06", 50.0)]));
        assert_eq!(index.len(), 2);
        let n = index.neighbors(ym("2024-07"));
        assert_eq!(n.before, Some((ym("2024-06"), 50.0)));
        assert_eq!(n.after, Some((ym("2024-09"), 80.0)));
    }

    #[test]
    fn duplicate_months_keep_first_seen() {
        let index = PopulationIndex::new(&pts(&[("2024-06", 50.0), ("2024-06", 70.0)]));
        assert_eq!(index.value_at(ym("2024-06")), Some(50.0));
        assert_eq!(index.value_at(ym("2024-08")), Some(50.0));
    }

    #[test]
    fn drops_points_without_denominator() {
        let metric = pts(&[("2024-01", 10.0), ("oops", 5.0), ("2024-02", 8.0)]);
        assert!(per_capita(&metric, &[], 1.0).is_empty());

        let zero_pop = pts(&[("2024-01", 0.0), ("2024-02", 4.0)]);
        let out = per_capita(&metric, &zero_pop, 1.0);
        assert_eq!(out, vec![TimeSeriesPoint::new("2024-02", 2.0)]);
    }

    #[test]
    fn applies_multiplier() {
        let out = calculate_per_capita(&[("2024-01", 5.0)], &[("2024-01", 1000.0)], 1000.0);
        assert_eq!(out[0].value, 5.0);
    }

    #[test]
    fn empty_metric_yields_empty_output() {
        let pop = pts(&[("2024-01", 10.0)]);
        assert!(per_capita(&[], &pop, 1.0).is_empty());
    }

    #[test]
    fn exact_ratio_skips_unmatched_dates() {
        let npr = pts(&[("2024-01", 10.0), ("2024-04", 20.0)]);
        let pop = pts(&[("2024-01", 100.0), ("2024-07", 300.0)]);
        let out = ratio_exact(&npr, &pop, 100.0);
        assert_eq!(out, vec![TimeSeriesPoint::new("2024-01", 10.0)]);

        // The interpolating path fills the same gap.
        assert_eq!(per_capita(&npr, &pop, 100.0).len(), 2);
    }

    #[test]
    fn exact_ratio_drops_zero_denominator() {
        let num = pts(&[("2024-01", 1.0), ("2024-02", 2.0)]);
        let den = pts(&[("2024-01", 0.0), ("2024-02", 4.0)]);
        assert_eq!(ratio_exact(&num, &den, 1.0), vec![TimeSeriesPoint::new("2024-02", 0.5)]);
    }

    #[test]
    fn non_residential_share_of_gdp() {
        let gross = pts(&[("2023-01", 120.0), ("2023-04", 130.0), ("2023-07", 140.0)]);
        let residential = pts(&[("2023-01", 20.0), ("2023-04", 30.0)]);
        let gdp = pts(&[("2023-01", 1000.0), ("2023-04", 500.0), ("2023-07", 700.0)]);
        let share = ratio_exact(&subtract_exact(&gross, &residential), &gdp, 100.0);
        assert_eq!(
            share,
            vec![TimeSeriesPoint::new("2023-01", 10.0), TimeSeriesPoint::new("2023-04", 20.0)]
        );
    }

    #[test]
    fn common_dates_intersects_in_first_order() {
        let assets = pts(&[("2024-04", 1.0), ("2024-01", 1.0), ("2024-07", 1.0), ("2024-01", 2.0)]);
        let liabilities = pts(&[("2024-01", 1.0), ("2024-04", 1.0)]);
        let equity = pts(&[("2024-04", 1.0), ("2024-01", 1.0), ("2024-10", 1.0)]);
        assert_eq!(
            common_dates(&[assets.as_slice(), liabilities.as_slice(), equity.as_slice()]),
            vec!["2024-04".to_string(), "2024-01".to_string()]
        );
        assert!(common_dates(&[]).is_empty());
        assert_eq!(common_dates(&[liabilities.as_slice()]).len(), 2);
    }
}
