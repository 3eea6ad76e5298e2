//! Item filters

use chrono::NaiveDate;

use super::dates::DateRange;
use super::item::ScheduleItem;
use super::params::{DisplayParams, SourceFilter};

/// Keep items from the selected feed
pub fn filter_by_source(items: Vec<ScheduleItem>, source: SourceFilter) -> Vec<ScheduleItem> {
    if source == SourceFilter::All {
        return items;
    }
    items
        .into_iter()
        .filter(|item| source.admits(item.source))
        .collect()
}

/// Case-insensitive partial match on location. A blank filter keeps everything.
pub fn filter_by_location(items: Vec<ScheduleItem>, location: Option<&str>) -> Vec<ScheduleItem> {
    let needle = match location.map(|l| l.trim().to_lowercase()) {
        Some(n) if !n.is_empty() => n,
        _ => return items,
    };

    items
        .into_iter()
        .filter(|item| {
            item.location
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
                .contains(&needle)
        })
        .collect()
}

/// Resolve the effective inclusive date window.
///
/// A specific date wins over a named range, which wins over explicit
/// start/end bounds.
pub fn resolve_window(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    range: Option<DateRange>,
    specific: Option<NaiveDate>,
    today: NaiveDate,
) -> (Option<NaiveDate>, Option<NaiveDate>) {
    if let Some(day) = specific {
        return (Some(day), Some(day));
    }
    if let Some(range) = range {
        let (first, last) = range.bounds(today);
        return (Some(first), Some(last));
    }
    (start, end)
}

/// Keep items inside the date window. Items without a date are dropped
/// whenever a bound applies.
pub fn filter_by_date_range(
    items: Vec<ScheduleItem>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    range: Option<DateRange>,
    specific: Option<NaiveDate>,
    today: NaiveDate,
) -> Vec<ScheduleItem> {
    let (start, end) = resolve_window(start, end, range, specific, today);
    if start.is_none() && end.is_none() {
        return items;
    }

    items
        .into_iter()
        .filter(|item| match item.date() {
            Some(day) => start.map_or(true, |s| day >= s) && end.map_or(true, |e| day <= e),
            None => false,
        })
        .collect()
}

/// Drop items dated before today; undated items stay
pub fn filter_past(items: Vec<ScheduleItem>, today: NaiveDate) -> Vec<ScheduleItem> {
    items
        .into_iter()
        .filter(|item| item.date().map_or(true, |day| day >= today))
        .collect()
}

/// Apply every filter named by `params`, in order: source, location, date, past
pub fn apply(params: &DisplayParams, items: Vec<ScheduleItem>, today: NaiveDate) -> Vec<ScheduleItem> {
    let before = items.len();

    let items = filter_by_source(items, params.source);
    let items = filter_by_location(items, params.location.as_deref());
    let items = filter_by_date_range(
        items,
        params.start,
        params.end,
        params.range,
        params.date,
        today,
    );
    let items = if params.filter_past {
        filter_past(items, today)
    } else {
        items
    };

    tracing::debug!("Filtered {} items down to {}", before, items.len());
    items
}
