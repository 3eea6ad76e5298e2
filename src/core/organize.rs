//! Merging feeds and grouping items into days

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use super::item::ScheduleItem;

/// Items sharing a calendar day. `date` is `None` for the undated bucket.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayGroup {
    pub date: Option<NaiveDate>,
    pub items: Vec<ScheduleItem>,
}

impl DayGroup {
    /// Heading like "Monday, January 12"
    pub fn heading(&self) -> String {
        match self.date {
            Some(date) => date.format("%A, %B %-d").to_string(),
            None => "Date TBD".to_string(),
        }
    }
}

/// Events first, then reservations
pub fn merge(events: Vec<ScheduleItem>, reservations: Vec<ScheduleItem>) -> Vec<ScheduleItem> {
    let (event_count, reservation_count) = (events.len(), reservations.len());

    let mut merged = events;
    merged.extend(reservations);

    tracing::info!(
        "Merged {} events and {} reservations into {} items",
        event_count,
        reservation_count,
        merged.len()
    );
    merged
}

/// Group by date, ascending, with the undated group last. Each group is
/// sorted by start time.
pub fn organize_by_date(items: Vec<ScheduleItem>) -> Vec<DayGroup> {
    let mut dated: BTreeMap<NaiveDate, Vec<ScheduleItem>> = BTreeMap::new();
    let mut undated = Vec::new();

    for item in items {
        match item.date() {
            Some(date) => dated.entry(date).or_default().push(item),
            None => undated.push(item),
        }
    }

    let mut groups: Vec<DayGroup> = dated
        .into_iter()
        .map(|(date, items)| DayGroup {
            date: Some(date),
            items: sort_by_time(items),
        })
        .collect();

    if !undated.is_empty() {
        groups.push(DayGroup {
            date: None,
            items: sort_by_time(undated),
        });
    }

    groups
}

/// Timed items by start, then untimed items; ties broken by title
pub fn sort_by_time(mut items: Vec<ScheduleItem>) -> Vec<ScheduleItem> {
    items.sort_by(compare_start);
    items
}

fn compare_start(a: &ScheduleItem, b: &ScheduleItem) -> Ordering {
    match (a.start, b.start) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.title.cmp(&b.title)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.title.cmp(&b.title),
    }
}
