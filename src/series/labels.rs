use super::date::{leading_year, YearMonth};

const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// `"2024-04"` → `"2024 Q2"`. Unparseable keys are returned unchanged.
pub fn quarter_label(date: &str) -> String {
    match YearMonth::parse(date) {
        Some(ym) => format!("{} Q{}", ym.year, (ym.month - 1) / 3 + 1),
        None => date.to_string(),
    }
}

/// `"2024-01"` → `"2024-Jan"`.
pub fn month_label(date: &str) -> String {
    match YearMonth::parse(date) {
        Some(ym) => format!("{}-{}", ym.year, MONTH_NAMES[(ym.month - 1) as usize]),
        None => date.to_string(),
    }
}

/// `"2024-01"` → `"2024"`.
pub fn year_label(date: &str) -> String {
    leading_year(date)
        .map(|y| y.to_string())
        .unwrap_or_else(|| date.to_string())
}
