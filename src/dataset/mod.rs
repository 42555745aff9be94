//! Statistical dataset files and their quality manifests.
//!
//! Dataset files look like `{ "data": { "<metric>": [["2024-01", 123.0], ...] } }`.
//! Date keys are `"YYYY-MM"` for monthly/quarterly series and a bare year
//! (string or number) for annual ones.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::series::date::YearMonth;
use crate::series::TimeSeriesPoint;

/// Date key of a raw observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawDate {
    Text(String),
    Number(f64),
}

impl RawDate {
    pub fn as_key(&self) -> Option<String> {
        match self {
            RawDate::Text(s) => Some(s.trim().to_string()),
            RawDate::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(format!("{}", *n as i64)),
            RawDate::Number(_) => None,
        }
    }
}

/// `[date, value]`; values may be null in published files.
pub type RawObservation = (RawDate, Option<f64>);

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatDataset {
    pub data: BTreeMap<String, Vec<RawObservation>>,
}

impl StatDataset {
    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).context("dataset is not {\"data\": {metric: [[date, value], ...]}}")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading dataset {}", path.display()))?;
        Self::from_json_str(&text).with_context(|| format!("parsing dataset {}", path.display()))
    }

    pub fn metric_names(&self) -> Vec<&str> {
        self.data.keys().map(String::as_str).collect()
    }

    /// Observations of `metric` with usable keys and non-null values, in file
    /// order. Date validity is left to the consumer.
    pub fn series(&self, metric: &str) -> Option<Vec<TimeSeriesPoint>> {
        let rows = self.data.get(metric)?;
        Some(
            rows.iter()
                .filter_map(|(date, value)| Some(TimeSeriesPoint::new(date.as_key()?, (*value)?)))
                .collect(),
        )
    }
}

// =============================================================================
// Quality manifest
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Monthly,
    Quarterly,
    Annual,
    Unknown,
}

impl Granularity {
    pub fn step_months(&self) -> Option<i64> {
        match self {
            Granularity::Monthly => Some(1),
            Granularity::Quarterly => Some(3),
            Granularity::Annual => Some(12),
            Granularity::Unknown => None,
        }
    }

    /// Most common positive step between consecutive observations.
    pub fn infer(months: &[YearMonth]) -> Self {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        for pair in months.windows(2) {
            let step = pair[0].months_until(pair[1]);
            if step > 0 {
                *counts.entry(step).or_insert(0) += 1;
            }
        }
        // Ties resolve to the smaller step.
        let mode = counts
            .iter()
            .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
            .map(|(step, _)| *step);
        match mode {
            Some(1) => Granularity::Monthly,
            Some(3) => Granularity::Quarterly,
            Some(12) => Granularity::Annual,
            _ => Granularity::Unknown,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    pub after: String,
    pub before: String,
    pub missing_periods: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSummary {
    pub name: String,
    pub rows: u64,
    pub bad_rows: u64,
    pub first: Option<String>,
    pub last: Option<String>,
    pub granularity: Granularity,
    pub gaps: Vec<Gap>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetManifest {
    pub path: String,
    pub hash_sha256: String,
    pub metrics: Vec<MetricSummary>,
    pub latest: Option<String>,
    pub stale_after_months: u32,
    pub stale: bool,
    pub warnings: Vec<String>,
    pub generated_at_epoch: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub metrics: u64,
    pub rows: u64,
    pub bad_rows: u64,
    pub gaps: u64,
    pub stale: bool,
    pub warnings: Vec<String>,
}

fn summarize_metric(name: &str, rows: &[RawObservation], warnings: &mut Vec<String>) -> MetricSummary {
    let mut bad_rows = 0u64;
    let mut months: Vec<YearMonth> = Vec::with_capacity(rows.len());

    for (date, value) in rows {
        let month = date.as_key().and_then(|k| YearMonth::parse_loose(&k));
        match (month, value) {
            (Some(m), Some(v)) if v.is_finite() => {
                if let Some(prev) = months.last() {
                    if m <= *prev {
                        warnings.push(format!("{}: non_monotonic_date: prev={} current={}", name, prev, m));
                    }
                }
                months.push(m);
            }
            _ => {
                bad_rows += 1;
                warnings.push(format!("{}: bad_row: {:?}", name, (date, value)));
            }
        }
    }

    let granularity = Granularity::infer(&months);
    let mut gaps = Vec::new();
    if let Some(step) = granularity.step_months() {
        for pair in months.windows(2) {
            let delta = pair[0].months_until(pair[1]);
            if delta > step {
                gaps.push(Gap {
                    after: pair[0].to_string(),
                    before: pair[1].to_string(),
                    missing_periods: delta / step - 1,
                });
            }
        }
    }

    MetricSummary {
        name: name.to_string(),
        rows: rows.len() as u64,
        bad_rows,
        first: months.first().map(|m| m.to_string()),
        last: months.last().map(|m| m.to_string()),
        granularity,
        gaps,
    }
}

pub fn analyze_dataset(
    path: &Path,
    stale_after_months: u32,
    now_ts: u64,
) -> Result<(DatasetManifest, DataQualityReport), String> {
    let hash = file_sha256(path)?;
    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let dataset = StatDataset::from_json_str(&text).map_err(|e| format!("{:#}", e))?;

    let mut warnings = Vec::new();
    let metrics: Vec<MetricSummary> = dataset
        .data
        .iter()
        .map(|(name, rows)| summarize_metric(name, rows, &mut warnings))
        .collect();

    if metrics.is_empty() {
        warnings.push("no_metrics".to_string());
    }

    let latest = metrics
        .iter()
        .filter_map(|m| m.last.as_deref().and_then(YearMonth::parse))
        .max();
    let now = YearMonth::from_epoch_secs(now_ts as i64);
    let stale = match (latest, now) {
        (Some(latest), Some(now)) => latest.months_until(now) > stale_after_months as i64,
        _ => true,
    };

    let report = DataQualityReport {
        metrics: metrics.len() as u64,
        rows: metrics.iter().map(|m| m.rows).sum(),
        bad_rows: metrics.iter().map(|m| m.bad_rows).sum(),
        gaps: metrics.iter().map(|m| m.gaps.len() as u64).sum(),
        stale,
        warnings: warnings.clone(),
    };

    let manifest = DatasetManifest {
        path: path.display().to_string(),
        hash_sha256: hash,
        metrics,
        latest: latest.map(|m| m.to_string()),
        stale_after_months,
        stale,
        warnings,
        generated_at_epoch: now_ts,
    };

    Ok((manifest, report))
}

pub fn file_sha256(path: &Path) -> Result<String, String> {
    let mut file = File::open(path).map_err(|e| e.to_string())?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

pub fn default_manifest_path(dataset_path: &Path) -> PathBuf {
    let mut p = dataset_path.to_path_buf();
    let fname = dataset_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset.json");
    p.set_file_name(format!("{}.manifest.json", fname));
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "data": {
            "Canada": [["2024-01", 41000000], ["2024-04", 41100000]],
            "Physician Supply": [[2019, 90000], [2020, null], ["2021", 95000]]
        }
    }"#;

    #[test]
    fn parses_mixed_date_keys() {
        let ds = StatDataset::from_json_str(SAMPLE).unwrap();
        assert_eq!(ds.metric_names(), vec!["Canada", "Physician Supply"]);
        let phys = ds.series("Physician Supply").unwrap();
        assert_eq!(phys.len(), 2);
        assert_eq!(phys[0], TimeSeriesPoint::new("2019", 90000.0));
        assert_eq!(phys[1].date, "2021");
        assert!(ds.series("Missing").is_none());
    }

    #[test]
    fn rejects_wrong_shape() {
        assert!(StatDataset::from_json_str(r#"{"rows": []}"#).is_err());
    }

    #[test]
    fn infers_granularity() {
        let months: Vec<YearMonth> = ["2024-01", "2024-04", "2024-07", "2025-01"]
            .iter()
            .filter_map(|s| YearMonth::parse(s))
            .collect();
        assert_eq!(Granularity::infer(&months), Granularity::Quarterly);
        assert_eq!(Granularity::infer(&months[..1]), Granularity::Unknown);
    }

    #[test]
    fn summary_counts_gaps_and_bad_rows() {
        let rows: Vec<RawObservation> = vec![
            (RawDate::Text("2024-01".into()), Some(1.0)),
            (RawDate::Text("2024-02".into()), Some(1.0)),
            (RawDate::Text("2024-03".into()), Some(1.0)),
            (RawDate::Text("2024-06".into()), Some(1.0)),
            (RawDate::Text("bogus".into()), Some(1.0)),
        ];
        let mut warnings = Vec::new();
        let summary = summarize_metric("starts", &rows, &mut warnings);
        assert_eq!(summary.granularity, Granularity::Monthly);
        assert_eq!(summary.bad_rows, 1);
        assert_eq!(
            summary.gaps,
            vec![Gap {
                after: "2024-03".into(),
                before: "2024-06".into(),
                missing_periods: 2
            }]
        );
        assert_eq!(summary.last.as_deref(), Some("2024-06"));
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    fn manifest_path_sits_next_to_dataset() {
        let p = default_manifest_path(Path::new("/tmp/metrics/gdp.json"));
        assert_eq!(p, PathBuf::from("/tmp/metrics/gdp.json.manifest.json"));
    }
}
