//! Filter, sort and paginate a promise list.
//!
//! `apply` is a pure reducer from `(records, FilterState)` to a page. Ranks,
//! directions and evidence dates are resolved once per record before the
//! sort so comparisons never re-parse strings.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

use super::{Direction, ImpactBucket, PromiseRecord};

pub const DEFAULT_PAGE_SIZE: usize = 10;

// =============================================================================
// Filter values
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressFilter {
    #[default]
    All,
    Complete,
    InProgress,
    NotStarted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImpactFilter {
    #[default]
    All,
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentFilter {
    #[default]
    All,
    Aligned,
    Neutral,
    NotAligned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Default,
    LastUpdated,
}

/// Whether changing a filter moves the user back to page 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PagePolicy {
    /// Page stays where it was, even if now out of range.
    #[default]
    Keep,
    ResetOnFilterChange,
}

// Unknown UI values fall back to the unfiltered default.
impl FromStr for ProgressFilter {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "complete" => ProgressFilter::Complete,
            "in_progress" => ProgressFilter::InProgress,
            "not_started" => ProgressFilter::NotStarted,
            _ => ProgressFilter::All,
        })
    }
}

impl FromStr for ImpactFilter {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "high" => ImpactFilter::High,
            "medium" => ImpactFilter::Medium,
            "low" => ImpactFilter::Low,
            _ => ImpactFilter::All,
        })
    }
}

impl FromStr for AlignmentFilter {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "aligned" => AlignmentFilter::Aligned,
            "neutral" => AlignmentFilter::Neutral,
            "not_aligned" => AlignmentFilter::NotAligned,
            _ => AlignmentFilter::All,
        })
    }
}

impl FromStr for SortBy {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "last_updated" => SortBy::LastUpdated,
            _ => SortBy::Default,
        })
    }
}

impl ProgressFilter {
    pub fn matches(&self, progress: i64) -> bool {
        match self {
            ProgressFilter::All => true,
            ProgressFilter::Complete => progress == 5,
            ProgressFilter::InProgress => (1..=4).contains(&progress),
            ProgressFilter::NotStarted => progress == 0,
        }
    }
}

impl ImpactFilter {
    /// Unranked promises only pass `All`.
    pub fn matches(&self, impact: ImpactBucket) -> bool {
        match self {
            ImpactFilter::All => true,
            ImpactFilter::High => impact == ImpactBucket::High,
            ImpactFilter::Medium => impact == ImpactBucket::Medium,
            ImpactFilter::Low => impact == ImpactBucket::Low,
        }
    }
}

impl AlignmentFilter {
    pub fn matches(&self, direction: Direction) -> bool {
        match self {
            AlignmentFilter::All => true,
            AlignmentFilter::Aligned => direction == Direction::Positive,
            AlignmentFilter::Neutral => direction == Direction::Neutral,
            AlignmentFilter::NotAligned => direction == Direction::Negative,
        }
    }
}

// =============================================================================
// Filter state
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub progress: ProgressFilter,
    pub impact: ImpactFilter,
    pub alignment: AlignmentFilter,
    pub sort_by: SortBy,
    /// 1-indexed.
    pub current_page: usize,
    pub policy: PagePolicy,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            progress: ProgressFilter::All,
            impact: ImpactFilter::All,
            alignment: AlignmentFilter::All,
            sort_by: SortBy::Default,
            current_page: 1,
            policy: PagePolicy::Keep,
        }
    }
}

impl FilterState {
    pub fn with_policy(policy: PagePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    fn filter_changed(&mut self) {
        if self.policy == PagePolicy::ResetOnFilterChange {
            self.current_page = 1;
        }
    }

    pub fn set_progress(&mut self, filter: ProgressFilter) {
        if self.progress != filter {
            self.progress = filter;
            self.filter_changed();
        }
    }

    pub fn set_impact(&mut self, filter: ImpactFilter) {
        if self.impact != filter {
            self.impact = filter;
            self.filter_changed();
        }
    }

    pub fn set_alignment(&mut self, filter: AlignmentFilter) {
        if self.alignment != filter {
            self.alignment = filter;
            self.filter_changed();
        }
    }

    /// Reordering never changes the result count, so the page is kept.
    pub fn set_sort_by(&mut self, sort_by: SortBy) {
        self.sort_by = sort_by;
    }

    pub fn set_page(&mut self, page: usize) {
        self.current_page = page.max(1);
    }

    pub fn matches(&self, record: &PromiseRecord) -> bool {
        self.progress.matches(record.progress())
            && self.impact.matches(record.impact())
            && self.alignment.matches(record.direction())
    }
}

// =============================================================================
// Reducer
// =============================================================================

/// Sort keys resolved once per record.
#[derive(Debug, Clone, Copy)]
struct SortKey {
    progress: i64,
    impact: ImpactBucket,
    evidence_ts: i64,
}

impl SortKey {
    fn of(record: &PromiseRecord) -> Self {
        Self {
            progress: record.progress(),
            impact: record.impact(),
            evidence_ts: record.evidence_ts(),
        }
    }

    /// Descending at every level.
    fn compare(&self, other: &Self, sort_by: SortBy) -> Ordering {
        match sort_by {
            SortBy::LastUpdated => other.evidence_ts.cmp(&self.evidence_ts),
            SortBy::Default => other
                .progress
                .cmp(&self.progress)
                .then(other.impact.cmp(&self.impact))
                .then(other.evidence_ts.cmp(&self.evidence_ts)),
        }
    }
}

/// Filtered and sorted view of `records`. Ties keep input order.
pub fn filter_and_sort<'a>(records: &'a [PromiseRecord], state: &FilterState) -> Vec<&'a PromiseRecord> {
    let mut keyed: Vec<(SortKey, &PromiseRecord)> = records
        .iter()
        .filter(|r| state.matches(r))
        .map(|r| (SortKey::of(r), r))
        .collect();
    // `sort_by` is stable.
    keyed.sort_by(|a, b| a.0.compare(&b.0, state.sort_by));
    keyed.into_iter().map(|(_, r)| r).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    pub fn is_out_of_range(&self) -> bool {
        self.items.is_empty() && self.page > self.total_pages.max(1)
    }
}

/// Slice `[(page-1)*size, page*size)`; pages past the end are empty.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size);
    let slice = items
        .get(start..)
        .map(|rest| &rest[..rest.len().min(page_size)])
        .unwrap_or(&[]);
    Page {
        items: slice.to_vec(),
        total: items.len(),
        page,
        page_size,
        total_pages: items.len().div_ceil(page_size),
    }
}

pub fn apply<'a>(records: &'a [PromiseRecord], state: &FilterState, page_size: usize) -> Page<&'a PromiseRecord> {
    let sorted = filter_and_sort(records, state);
    paginate(&sorted, state.current_page, page_size)
}
