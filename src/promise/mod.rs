//! Promise records as served by the API, plus the derived classifications
//! (impact bucket, alignment direction) the list views filter and sort on.

pub mod engine;
pub mod timeline;

use chrono::{NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::series::date::parse_timestamp_millis;

/// One row of a department's promise list. Read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PromiseRecord {
    pub id: i64,
    #[serde(default)]
    pub concise_title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub progress_score: Option<i64>,
    #[serde(default)]
    pub progress_summary: Option<String>,
    #[serde(default)]
    pub bc_promise_rank: Rank,
    #[serde(default)]
    pub bc_promise_rank_rationale: Option<String>,
    #[serde(default)]
    pub bc_promise_direction: Option<String>,
    #[serde(default)]
    pub last_evidence_date: Option<String>,
}

/// The rank field arrives as a label, a numeric string, a bare number or null.
fn rank_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(f64),
    }
    Ok(match Option::<Raw>::deserialize(deserializer)? {
        Some(Raw::Text(s)) => s,
        Some(Raw::Number(n)) => n.to_string(),
        None => String::new(),
    })
}

impl PromiseRecord {
    /// Progress on the 0..=5 scale; null counts as 0.
    pub fn progress(&self) -> i64 {
        self.progress_score.unwrap_or(0)
    }

    pub fn rank(&self) -> RankValue {
        self.bc_promise_rank.value()
    }

    pub fn impact(&self) -> ImpactBucket {
        self.rank().bucket()
    }

    pub fn direction(&self) -> Direction {
        Direction::parse(self.bc_promise_direction.as_deref())
    }

    /// Millisecond timestamp of the latest evidence; 0 when absent or unreadable.
    pub fn evidence_ts(&self) -> i64 {
        self.last_evidence_date
            .as_deref()
            .and_then(parse_timestamp_millis)
            .unwrap_or(0)
    }
}

// =============================================================================
// Rank and impact
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankLabel {
    Strong,
    Medium,
    Weak,
}

/// `bc_promise_rank` resolved once. A label always beats numeric parsing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankValue {
    Label(RankLabel),
    Numeric(f64),
    Unranked,
}

/// Rank as received, resolved into a [`RankValue`] when the record is read.
/// Serializes back to the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct Rank {
    raw: String,
    value: RankValue,
}

impl Rank {
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            value: RankValue::parse(raw),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> RankValue {
        self.value
    }
}

impl Default for Rank {
    fn default() -> Self {
        Self {
            raw: String::new(),
            value: RankValue::Unranked,
        }
    }
}

impl From<&str> for Rank {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl Serialize for Rank {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        rank_text(deserializer).map(|raw| Rank::parse(&raw))
    }
}

impl RankValue {
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "strong" => return RankValue::Label(RankLabel::Strong),
            "medium" => return RankValue::Label(RankLabel::Medium),
            "weak" => return RankValue::Label(RankLabel::Weak),
            _ => {}
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => RankValue::Numeric(n),
            _ => RankValue::Unranked,
        }
    }

    pub fn bucket(&self) -> ImpactBucket {
        match *self {
            RankValue::Label(RankLabel::Strong) => ImpactBucket::High,
            RankValue::Label(RankLabel::Medium) => ImpactBucket::Medium,
            RankValue::Label(RankLabel::Weak) => ImpactBucket::Low,
            RankValue::Numeric(n) if n >= 8.0 => ImpactBucket::High,
            RankValue::Numeric(n) if n >= 5.0 => ImpactBucket::Medium,
            RankValue::Numeric(n) if n > 0.0 => ImpactBucket::Low,
            RankValue::Numeric(_) | RankValue::Unranked => ImpactBucket::None,
        }
    }
}

/// Ordinal impact, 0..=3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImpactBucket {
    None = 0,
    Low = 1,
    Medium = 2,
    High = 3,
}

impl ImpactBucket {
    pub fn level(&self) -> u8 {
        *self as u8
    }

    pub fn label(&self) -> &'static str {
        match self {
            ImpactBucket::High => "High Impact",
            ImpactBucket::Medium => "Medium Impact",
            ImpactBucket::Low => "Low Impact",
            ImpactBucket::None => "",
        }
    }
}

pub fn impact_bucket(raw_rank: &str) -> ImpactBucket {
    RankValue::parse(raw_rank).bucket()
}

// =============================================================================
// Alignment and progress
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Positive,
    Neutral,
    Negative,
    Unknown,
}

impl Direction {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            Some("positive") => Direction::Positive,
            Some("neutral") => Direction::Neutral,
            Some("negative") => Direction::Negative,
            _ => Direction::Unknown,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Direction::Positive => "Aligned",
            Direction::Neutral => "Neutral",
            Direction::Negative => "Not Aligned",
            Direction::Unknown => "Unknown",
        }
    }
}

pub fn progress_label(score: i64) -> &'static str {
    match score {
        0 => "No progress made yet",
        1 => "Early progress made",
        2 => "Some progress made",
        3 => "Good progress made",
        4 => "Almost complete",
        5 => "Complete",
        _ => "",
    }
}

// =============================================================================
// API shapes around promises
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Minister {
    #[serde(default)]
    pub order_of_precedence: i64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub person_short_honorific: Option<String>,
}

impl Minister {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn initials(&self) -> String {
        name_initials(&self.full_name())
    }
}

/// Shown when a department has no minister on record.
pub const PLACEHOLDER_MINISTER_NAME: &str = "Minister Information Not Available";

/// Avatar fallback: "Jane Doe" → "JD"; the placeholder name → "N/A".
pub fn name_initials(name: &str) -> String {
    if name == PLACEHOLDER_MINISTER_NAME {
        return "N/A".to_string();
    }
    name.split_whitespace()
        .filter_map(|part| part.chars().next())
        .flat_map(char::to_uppercase)
        .collect()
}

pub fn minister_name(minister: Option<&Minister>) -> String {
    minister
        .map(Minister::full_name)
        .unwrap_or_else(|| PLACEHOLDER_MINISTER_NAME.to_string())
}

/// Commitment target date; promises are flagged overdue this long after it.
pub const COMMITMENT_TARGET: (i32, u32, u32) = (2025, 5, 27);
pub const OVERDUE_AFTER_DAYS: i64 = 90;

/// Whole days elapsed since the commitment target exceed the grace period.
pub fn is_overdue(now_secs: i64) -> bool {
    let (y, m, d) = COMMITMENT_TARGET;
    let Some(target) = NaiveDate::from_ymd_opt(y, m, d).and_then(|date| date.and_hms_opt(0, 0, 0)) else {
        return false;
    };
    let target_secs = Utc.from_utc_datetime(&target).timestamp();
    (now_secs - target_secs).div_euclid(86_400) > OVERDUE_AFTER_DAYS
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepartmentListing {
    pub id: i64,
    pub slug: String,
    pub display_name: String,
    #[serde(default)]
    pub official_name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub government_id: Option<i64>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub slug: String,
    pub display_name: String,
    #[serde(default)]
    pub official_name: String,
    #[serde(default)]
    pub priority: i64,
    #[serde(default)]
    pub minister: Option<Minister>,
    #[serde(default)]
    pub promises: Vec<PromiseRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_beat_numbers() {
        assert_eq!(impact_bucket("strong"), ImpactBucket::High);
        assert_eq!(impact_bucket("Medium"), ImpactBucket::Medium);
        assert_eq!(impact_bucket(" WEAK "), ImpactBucket::Low);
    }

    #[test]
    fn numeric_thresholds() {
        assert_eq!(impact_bucket("9"), ImpactBucket::High);
        assert_eq!(impact_bucket("8"), ImpactBucket::High);
        assert_eq!(impact_bucket("7"), ImpactBucket::Medium);
        assert_eq!(impact_bucket("5"), ImpactBucket::Medium);
        assert_eq!(impact_bucket("4.9"), ImpactBucket::Low);
        assert_eq!(impact_bucket("0.5"), ImpactBucket::Low);
        assert_eq!(impact_bucket("0"), ImpactBucket::None);
        assert_eq!(impact_bucket("-3"), ImpactBucket::None);
        assert_eq!(impact_bucket("high"), ImpactBucket::None);
        assert_eq!(impact_bucket(""), ImpactBucket::None);
        assert_eq!(impact_bucket("NaN"), ImpactBucket::None);
    }

    #[test]
    fn bucketing_is_repeatable() {
        for raw in ["strong", "7", "", "abc", "10"] {
            assert_eq!(impact_bucket(raw), impact_bucket(raw));
        }
        assert_eq!(ImpactBucket::Medium.level(), 2);
    }

    #[test]
    fn record_defaults_are_lowest_bucket() {
        let rec: PromiseRecord = serde_json::from_str(r#"{"id": 1}"#).unwrap();
        assert_eq!(rec.progress(), 0);
        assert_eq!(rec.impact(), ImpactBucket::None);
        assert_eq!(rec.direction(), Direction::Unknown);
        assert_eq!(rec.evidence_ts(), 0);
    }

    #[test]
    fn numeric_rank_field_is_accepted() {
        let rec: PromiseRecord =
            serde_json::from_str(r#"{"id": 2, "bc_promise_rank": 9, "progress_score": null}"#).unwrap();
        assert_eq!(rec.bc_promise_rank.as_str(), "9");
        assert_eq!(rec.rank(), RankValue::Numeric(9.0));
        assert_eq!(serde_json::to_value(&rec).unwrap()["bc_promise_rank"], "9");
    }

    #[test]
    fn rank_is_resolved_when_read() {
        let rec: PromiseRecord = serde_json::from_str(r#"{"id": 3, "bc_promise_rank": " Strong "}"#).unwrap();
        assert_eq!(rec.bc_promise_rank.value(), RankValue::Label(RankLabel::Strong));
        assert_eq!(rec.bc_promise_rank.as_str(), " Strong ");
        let null: PromiseRecord = serde_json::from_str(r#"{"id": 4, "bc_promise_rank": null}"#).unwrap();
        assert_eq!(null.rank(), RankValue::Unranked);
        assert_eq!(rec.impact(), ImpactBucket::High);
        assert_eq!(rec.progress(), 0);
    }

    #[test]
    fn direction_labels() {
        assert_eq!(Direction::parse(Some("Positive")), Direction::Positive);
        assert_eq!(Direction::parse(Some("negative")).label(), "Not Aligned");
        assert_eq!(Direction::parse(None).label(), "Unknown");
    }

    #[test]
    fn progress_labels() {
        assert_eq!(progress_label(0), "No progress made yet");
        assert_eq!(progress_label(5), "Complete");
        assert_eq!(progress_label(9), "");
    }

    #[test]
    fn minister_initials() {
        let m = Minister {
            order_of_precedence: 1,
            started_at: None,
            ended_at: None,
            first_name: "jane".into(),
            last_name: "Doe".into(),
            title: "Minister of Finance".into(),
            avatar_url: None,
            person_short_honorific: None,
        };
        assert_eq!(m.initials(), "JD");
    }

    #[test]
    fn placeholder_minister_has_na_initials() {
        assert_eq!(minister_name(None), PLACEHOLDER_MINISTER_NAME);
        assert_eq!(name_initials(&minister_name(None)), "N/A");
        assert_eq!(name_initials("mary jo smith"), "MJS");
    }

    #[test]
    fn overdue_after_ninety_whole_days() {
        // 2025-05-27T00:00:00Z
        let target = 1_748_304_000;
        let day = 86_400;
        assert!(!is_overdue(target));
        assert!(!is_overdue(target + 90 * day));
        assert!(!is_overdue(target + 91 * day - 1));
        assert!(is_overdue(target + 91 * day));
        assert!(!is_overdue(target - 200 * day));
    }
}
