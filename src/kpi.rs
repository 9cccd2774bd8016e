use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use crate::model::work_item::WorkItemRecord;

/// States after which an item no longer counts as open work.
pub const FINAL_STATES: [&str; 3] = ["Closed", "Removed", "Resolved"];

pub const UNASSIGNED: &str = "Unassigned";
pub const UNSPECIFIED_AREA: &str = "Unspecified";

/// Business definitions shown next to the numbers.
pub const GLOSSARY: [(&str, &str); 12] = [
    ("Total Items", "Total number of child work items under the selected epics, regardless of state."),
    ("Open Items", "Child work items not in a final state (Closed, Resolved or Removed)."),
    ("Closed Items", "Child work items that have reached a final state (Closed, Resolved or Removed)."),
    ("% Complete", "100 x Closed Items / Total Items."),
    ("New (7d)", "Work items created in the last 7 days."),
    ("Closed (7d)", "Work items closed or removed in the last 7 days."),
    ("Avg Cycle (days)", "Average time from creation to closing for items that have closed."),
    ("Max Age (days)", "Longest duration of any item: closed duration, or current age if still open."),
    ("Avg Age (days)", "Average duration: closed duration, or current age for open items."),
    ("Type Breakdown", "Distribution of work item types (Feature, Story, Task, Bug...) under the selected epics."),
    ("Top Assignees", "The three people with the most open child work items."),
    ("Last Sync", "UTC time of the last fetch from Azure DevOps."),
];

pub fn is_final(state: &str) -> bool {
    FINAL_STATES.contains(&state)
}

/// Summary of the work below the selected epic.
#[derive(Debug, Clone, PartialEq)]
pub struct Kpis {
    pub total: usize,
    pub open: usize,
    pub closed: usize,
    pub pct_complete: f64,
    pub new_7d: usize,
    pub closed_7d: usize,
    /// Mean days from creation to last change, closed items only.
    pub avg_cycle_days: f64,
    /// Closed items count their cycle time, open items their current age.
    pub max_age_days: i64,
    pub avg_age_days: f64,
    pub type_breakdown: Vec<(String, usize)>,
    /// Top three owners of open items.
    pub top_assignees: Vec<(String, usize)>,
    pub last_sync: DateTime<Utc>,
}

pub fn compute(items: &[WorkItemRecord], now: DateTime<Utc>) -> Kpis {
    let window = now - Duration::days(7);
    let total = items.len();
    let closed = items.iter().filter(|i| is_final(i.state())).count();
    let open = total - closed;

    let new_7d = items
        .iter()
        .filter(|i| i.created_date().is_some_and(|d| d >= window))
        .count();
    let closed_7d = items
        .iter()
        .filter(|i| is_final(i.state()) && i.changed_date().is_some_and(|d| d >= window))
        .count();

    let cycles: Vec<i64> = items
        .iter()
        .filter(|i| is_final(i.state()))
        .filter_map(|i| Some((i.changed_date()? - i.created_date()?).num_days()))
        .collect();

    let ages: Vec<i64> = items
        .iter()
        .filter_map(|i| {
            let created = i.created_date()?;
            let end = if is_final(i.state()) {
                i.changed_date()?
            } else {
                now
            };
            Some((end - created).num_days())
        })
        .collect();

    let open_owners = items
        .iter()
        .filter(|i| !is_final(i.state()))
        .map(|i| i.assigned_to().unwrap_or(UNASSIGNED));
    let mut top_assignees = tally(open_owners);
    top_assignees.truncate(3);

    Kpis {
        total,
        open,
        closed,
        pct_complete: if total == 0 {
            0.0
        } else {
            round1(closed as f64 / total as f64 * 100.0)
        },
        new_7d,
        closed_7d,
        avg_cycle_days: mean(&cycles),
        max_age_days: ages.iter().copied().max().unwrap_or(0),
        avg_age_days: mean(&ages),
        type_breakdown: tally(items.iter().map(|i| i.work_item_type())),
        top_assignees,
        last_sync: now,
    }
}

/// Open epic count per area path, largest first.
pub fn area_counts(epics: &[WorkItemRecord]) -> Vec<(String, usize)> {
    tally(epics.iter().map(|e| e.area_path().unwrap_or(UNSPECIFIED_AREA)))
}

/// The quietest area; loading it first keeps the first screen fast.
pub fn fewest_area(counts: &[(String, usize)]) -> Option<&str> {
    counts
        .iter()
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)))
        .map(|(name, _)| name.as_str())
}

/// Counts by key, sorted by count descending then key ascending.
fn tally<'a>(keys: impl Iterator<Item = &'a str>) -> Vec<(String, usize)> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    let mut out: Vec<(String, usize)> = counts
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
    out.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    out
}

fn mean(values: &[i64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round1(values.iter().sum::<i64>() as f64 / values.len() as f64)
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// `12345` → `"12,345"`.
pub fn with_commas(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
