//! End-to-end checks of the promise list pipeline: payload decoding, the
//! filter/sort/paginate reducer, and the source trait seam.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::HashSet;

use promisetrack::client::{FetchState, PromiseSource};
use promisetrack::promise::engine::{
    apply, filter_and_sort, paginate, AlignmentFilter, FilterState, ImpactFilter, PagePolicy, ProgressFilter,
    SortBy, DEFAULT_PAGE_SIZE,
};
use promisetrack::promise::timeline::{build_timeline, PromiseDetail};
use promisetrack::promise::{impact_bucket, Department, DepartmentListing, ImpactBucket, PromiseRecord};

fn record(id: i64, score: Option<i64>, rank: &str) -> PromiseRecord {
    PromiseRecord {
        id,
        progress_score: score,
        bc_promise_rank: rank.into(),
        ..PromiseRecord::default()
    }
}

/// A department with a spread of scores, ranks, directions and dates.
fn large_department() -> Vec<PromiseRecord> {
    let ranks = ["strong", "medium", "weak", "9", "6", "2", "", "0"];
    let directions = ["positive", "neutral", "negative"];
    (0..37)
        .map(|i| PromiseRecord {
            id: i,
            progress_score: if i % 7 == 0 { None } else { Some(i % 6) },
            bc_promise_rank: ranks[i as usize % ranks.len()].into(),
            bc_promise_direction: Some(directions[i as usize % directions.len()].to_string()),
            last_evidence_date: if i % 4 == 0 {
                None
            } else {
                Some(format!("2025-{:02}-{:02}", i % 12 + 1, i % 27 + 1))
            },
            ..PromiseRecord::default()
        })
        .collect()
}

#[test]
fn scenario_descending_progress_dominates() {
    let records = vec![record(1, Some(5), "strong"), record(2, Some(0), "weak"), record(3, Some(3), "medium")];
    let page = apply(&records, &FilterState::default(), DEFAULT_PAGE_SIZE);
    let scores: Vec<i64> = page.items.iter().map(|r| r.progress()).collect();
    assert_eq!(scores, vec![5, 3, 0]);
}

#[test]
fn scenario_not_started_filter() {
    let records = vec![record(1, Some(5), "strong"), record(2, Some(0), "weak"), record(3, Some(3), "medium")];
    let mut state = FilterState::default();
    state.set_progress(ProgressFilter::NotStarted);
    let out = filter_and_sort(&records, &state);
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].id, 2);
}

#[test]
fn scenario_numeric_rank_buckets() {
    assert_eq!(impact_bucket("7"), ImpactBucket::Medium);
    assert_eq!(impact_bucket("7").level(), 2);
    assert_eq!(impact_bucket("9"), ImpactBucket::High);
    assert_eq!(impact_bucket("9").level(), 3);
}

#[test]
fn pages_concatenate_to_full_sorted_list() {
    let records = large_department();
    let state = FilterState::default();
    let full: Vec<i64> = filter_and_sort(&records, &state).iter().map(|r| r.id).collect();
    assert_eq!(full.len(), records.len());

    let first = apply(&records, &state, DEFAULT_PAGE_SIZE);
    let mut concatenated = Vec::new();
    for page in 1..=first.total_pages {
        let mut s = state.clone();
        s.set_page(page);
        concatenated.extend(apply(&records, &s, DEFAULT_PAGE_SIZE).items.iter().map(|r| r.id));
    }
    assert_eq!(first.total_pages, 4);
    assert_eq!(concatenated, full);
    let unique: HashSet<i64> = concatenated.iter().copied().collect();
    assert_eq!(unique.len(), records.len());
}

#[test]
fn combined_filters_are_conjunctive() {
    let records = large_department();
    let mut state = FilterState::default();
    state.set_impact(ImpactFilter::High);
    state.set_alignment(AlignmentFilter::Aligned);
    let out = filter_and_sort(&records, &state);
    assert!(!out.is_empty());
    for r in &out {
        assert_eq!(r.impact(), ImpactBucket::High);
        assert_eq!(r.bc_promise_direction.as_deref(), Some("positive"));
    }
    let expected = records
        .iter()
        .filter(|r| r.impact() == ImpactBucket::High && r.bc_promise_direction.as_deref() == Some("positive"))
        .count();
    assert_eq!(out.len(), expected);
}

#[test]
fn last_updated_is_descending_by_evidence() {
    let records = large_department();
    let state = FilterState {
        sort_by: SortBy::LastUpdated,
        ..FilterState::default()
    };
    let out = filter_and_sort(&records, &state);
    for pair in out.windows(2) {
        assert!(pair[0].evidence_ts() >= pair[1].evidence_ts());
    }
}

#[test]
fn filter_without_reset_can_strand_page() {
    let records = large_department();
    let mut state = FilterState::default();
    state.set_page(4);
    state.set_progress(ProgressFilter::Complete);
    let page = apply(&records, &state, DEFAULT_PAGE_SIZE);
    assert!(page.items.is_empty());
    assert!(page.is_out_of_range());

    let mut reset = FilterState::with_policy(PagePolicy::ResetOnFilterChange);
    reset.set_page(4);
    reset.set_progress(ProgressFilter::Complete);
    let page = apply(&records, &reset, DEFAULT_PAGE_SIZE);
    assert_eq!(page.page, 1);
    assert!(!page.items.is_empty());
}

#[test]
fn paginate_generic_slice() {
    let page = paginate(&["a", "b", "c"], 2, 2);
    assert_eq!(page.items, vec!["c"]);
    assert_eq!(page.total, 3);
}

// =============================================================================
// Source seam
// =============================================================================

struct FixtureSource {
    department: Department,
}

#[async_trait]
impl PromiseSource for FixtureSource {
    async fn departments(&self) -> Result<Vec<DepartmentListing>> {
        Ok(vec![DepartmentListing {
            id: 1,
            slug: self.department.slug.clone(),
            display_name: self.department.display_name.clone(),
            official_name: self.department.official_name.clone(),
            priority: 1,
            government_id: None,
            created_at: None,
            updated_at: None,
        }])
    }

    async fn department(&self, slug: &str) -> Result<Department> {
        if slug == self.department.slug {
            Ok(self.department.clone())
        } else {
            Err(anyhow!("404 department {}", slug))
        }
    }

    async fn promise(&self, id: i64) -> Result<PromiseDetail> {
        Err(anyhow!("404 promise {}", id))
    }
}

const DEPARTMENT_JSON: &str = r#"{
    "slug": "finance-canada",
    "display_name": "Finance",
    "official_name": "Department of Finance Canada",
    "priority": 1,
    "minister": {"order_of_precedence": 3, "first_name": "Jane", "last_name": "Doe", "title": "Minister of Finance"},
    "promises": [
        {"id": 10, "concise_title": "Cut red tape", "progress_score": 2, "bc_promise_rank": "weak", "bc_promise_direction": "positive", "last_evidence_date": "2025-06-01"},
        {"id": 11, "concise_title": "Balance budget", "progress_score": null, "bc_promise_rank": "8", "bc_promise_direction": "negative"},
        {"id": 12, "concise_title": "Tax cut", "progress_score": 5, "bc_promise_rank": "strong", "bc_promise_direction": "positive", "last_evidence_date": "2025-07-15T10:00:00Z"}
    ]
}"#;

#[tokio::test]
async fn source_feeds_reducer() {
    let department: Department = serde_json::from_str(DEPARTMENT_JSON).unwrap();
    let source = FixtureSource { department };

    let listings = source.departments().await.unwrap();
    let dept = source.department(&listings[0].slug).await.unwrap();
    assert_eq!(dept.minister.as_ref().unwrap().full_name(), "Jane Doe");

    let page = apply(&dept.promises, &FilterState::default(), DEFAULT_PAGE_SIZE);
    let ids: Vec<i64> = page.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![12, 10, 11]);
}

#[tokio::test]
async fn missing_resource_becomes_unavailable_state() {
    let department: Department = serde_json::from_str(DEPARTMENT_JSON).unwrap();
    let source = FixtureSource { department };

    let state = FetchState::from_result(source.department("health-canada").await);
    assert!(!state.is_loaded());

    let timeline = FetchState::from_result(source.promise(10).await.map(|d| build_timeline(&d)));
    assert!(!timeline.is_loaded());
}
