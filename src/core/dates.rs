//! Date parsing and named date ranges

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognised date '{0}'")]
pub struct DateParseError(pub String);

/// Formats tried after the two canonical ones
const FALLBACK_FORMATS: &[&str] = &["%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%b %d %Y", "%d %B %Y"];

/// Parse a user-supplied date: `YYYY-MM-DD`, `MM/DD/YYYY`, or a few
/// spelled-out forms like `January 12, 2026`
pub fn parse_date(input: &str) -> Result<NaiveDate, DateParseError> {
    let s = input.trim();

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%m/%d/%Y"))
        .or_else(|_| {
            FALLBACK_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .ok_or(())
        })
        .map_err(|_| DateParseError(input.to_string()))
}

/// Named window relative to today
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateRange {
    Today,
    Tomorrow,
    ThisWeek,
    NextWeek,
    ThisMonth,
    NextMonth,
    Next10Days,
}

impl DateRange {
    pub const ALL: [DateRange; 7] = [
        DateRange::Today,
        DateRange::Tomorrow,
        DateRange::ThisWeek,
        DateRange::NextWeek,
        DateRange::ThisMonth,
        DateRange::NextMonth,
        DateRange::Next10Days,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DateRange::Today => "today",
            DateRange::Tomorrow => "tomorrow",
            DateRange::ThisWeek => "this-week",
            DateRange::NextWeek => "next-week",
            DateRange::ThisMonth => "this-month",
            DateRange::NextMonth => "next-month",
            DateRange::Next10Days => "next-10-days",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateRange::Today => "Today",
            DateRange::Tomorrow => "Tomorrow",
            DateRange::ThisWeek => "This Week",
            DateRange::NextWeek => "Next Week",
            DateRange::ThisMonth => "This Month",
            DateRange::NextMonth => "Next Month",
            DateRange::Next10Days => "Next 10 Days",
        }
    }

    /// Case-insensitive lookup by query name
    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        Self::ALL.into_iter().find(|r| r.as_str() == lower)
    }

    /// Inclusive first and last day of the range. Weeks start on Monday.
    pub fn bounds(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        match self {
            DateRange::Today => (today, today),
            DateRange::Tomorrow => {
                let tomorrow = today + Days::new(1);
                (tomorrow, tomorrow)
            }
            DateRange::ThisWeek => {
                let monday = week_start(today);
                (monday, monday + Days::new(6))
            }
            DateRange::NextWeek => {
                let monday = week_start(today) + Days::new(7);
                (monday, monday + Days::new(6))
            }
            DateRange::ThisMonth => month_bounds(month_start(today)),
            DateRange::NextMonth => month_bounds(month_start(today) + Months::new(1)),
            DateRange::Next10Days => (today, today + Days::new(9)),
        }
    }
}

fn week_start(day: NaiveDate) -> NaiveDate {
    day - Days::new(u64::from(day.weekday().num_days_from_monday()))
}

fn month_start(day: NaiveDate) -> NaiveDate {
    day.with_day(1).unwrap_or(day)
}

fn month_bounds(first: NaiveDate) -> (NaiveDate, NaiveDate) {
    let last = (first + Months::new(1)) - Days::new(1);
    (first, last)
}
