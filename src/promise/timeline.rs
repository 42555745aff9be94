//! Progress timeline for a single promise: the mandate commitment followed
//! by its evidence items, in chronological order.

use serde::{Deserialize, Serialize};

use crate::series::date::{format_long, DateInput};

pub const MANDATE_SOURCE_TYPE: &str = "Mandate Letter Commitment (Structured)";
const NODE_TITLE_CHARS: usize = 70;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub published_at: Option<DateInput>,
    #[serde(default)]
    pub impact: Option<String>,
    #[serde(default)]
    pub impact_magnitude: Option<String>,
    #[serde(default)]
    pub impact_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RationaleEvent {
    pub date: String,
    pub action: String,
    #[serde(default)]
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromiseDetail {
    pub id: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub concise_title: String,
    #[serde(default)]
    pub progress_score: Option<i64>,
    #[serde(default)]
    pub progress_summary: Option<String>,
    #[serde(default)]
    pub what_it_means_for_canadians: Option<String>,
    #[serde(default)]
    pub commitment_history_rationale: Vec<RationaleEvent>,
    #[serde(default)]
    pub evidences: Vec<Evidence>,
    #[serde(default)]
    pub source_url: Option<String>,
    #[serde(default)]
    pub last_evidence_date: Option<String>,
    #[serde(default)]
    pub source_type: String,
    #[serde(default)]
    pub date_issued: Option<DateInput>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Mandate,
    Evidence,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEvent {
    pub id: String,
    pub kind: EventKind,
    pub millis: Option<i64>,
    pub display_date: String,
    /// Short node title.
    pub title: String,
    pub full_title: String,
    pub full_text: String,
    pub source_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Timeline {
    pub events: Vec<TimelineEvent>,
    /// Index of the initially selected event (the most recent one).
    pub selected: Option<usize>,
}

fn truncate_title(text: &str) -> String {
    if text.chars().count() > NODE_TITLE_CHARS {
        let head: String = text.chars().take(NODE_TITLE_CHARS).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

pub fn build_timeline(detail: &PromiseDetail) -> Timeline {
    let mut events = Vec::with_capacity(detail.evidences.len() + 1);

    if detail.source_type == MANDATE_SOURCE_TYPE {
        if let Some(issued) = &detail.date_issued {
            events.push(TimelineEvent {
                id: format!("mandate-{}", detail.id),
                kind: EventKind::Mandate,
                millis: issued.to_millis(),
                display_date: issued.format_long(),
                title: truncate_title(&detail.text),
                full_title: detail.text.clone(),
                full_text: detail.text.clone(),
                source_url: None,
            });
        }
    }

    events.extend(detail.evidences.iter().map(|ev| TimelineEvent {
        id: format!("ev-{}", ev.id),
        kind: EventKind::Evidence,
        millis: ev.published_at.as_ref().and_then(DateInput::to_millis),
        display_date: format_long(ev.published_at.as_ref()),
        title: ev.title.clone(),
        full_title: ev.title.clone(),
        full_text: ev.summary.clone(),
        source_url: ev.source_url.clone(),
    }));

    // Ascending; undated events go last, in input order.
    events.sort_by(|a, b| match (a.millis, b.millis) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let selected = events.len().checked_sub(1);
    Timeline { events, selected }
}
