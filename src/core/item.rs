//! Schedule item model - one event or reservation, normalized across feeds

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Feed an item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    WildApricot,
    Skedda,
}

impl Source {
    /// Query-string / wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::WildApricot => "wild-apricot",
            Source::Skedda => "skedda",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Source::WildApricot => "Wild Apricot",
            Source::Skedda => "Skedda",
        }
    }

    pub fn from_str_opt(s: &str) -> Option<Self> {
        match s {
            "wild-apricot" => Some(Source::WildApricot),
            "skedda" => Some(Source::Skedda),
            _ => None,
        }
    }
}

/// Who can attend an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AccessStatus {
    Open,
    MembersOnly,
    Full,
    Canceled,
    #[default]
    Unknown,
}

impl AccessStatus {
    pub fn label(&self) -> &'static str {
        match self {
            AccessStatus::Open => "Open",
            AccessStatus::MembersOnly => "Members Only",
            AccessStatus::Full => "Full",
            AccessStatus::Canceled => "Canceled",
            AccessStatus::Unknown => "unknown",
        }
    }

    /// Derive access from registration counts and the event title.
    ///
    /// A full event is reported as full even when its title says canceled.
    pub fn derive(title: &str, capacity: Option<u32>, active: u32) -> Self {
        if capacity.is_some_and(|cap| active >= cap) {
            return AccessStatus::Full;
        }

        let upper = title.to_uppercase();
        if upper.contains("CANCELED") {
            AccessStatus::Canceled
        } else if upper.contains("MEMBER") {
            AccessStatus::MembersOnly
        } else {
            AccessStatus::Open
        }
    }
}

/// Feed-specific fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ItemDetails {
    Event {
        #[serde(skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
        access: AccessStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        capacity: Option<u32>,
        enrollment: u32,
        confirmed: u32,
        pending: u32,
    },
    Reservation {
        status: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// A single calendar entry shown on the board
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleItem {
    pub source: Source,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub title: String,

    /// Room or area; feeds call it location or space interchangeably
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Start in the feed's wall-clock time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDateTime>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDateTime>,

    /// Date for all-day entries or entries whose time could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<i64>,

    pub details: ItemDetails,
}

impl ScheduleItem {
    /// Create a Wild Apricot event with unknown access and no registrations
    pub fn event(title: impl Into<String>) -> Self {
        Self::blank(
            Source::WildApricot,
            title,
            ItemDetails::Event {
                event_type: None,
                access: AccessStatus::Unknown,
                capacity: None,
                enrollment: 0,
                confirmed: 0,
                pending: 0,
            },
        )
    }

    /// Create a confirmed Skedda reservation
    pub fn reservation(title: impl Into<String>) -> Self {
        Self::blank(
            Source::Skedda,
            title,
            ItemDetails::Reservation {
                status: "CONFIRMED".to_string(),
                description: None,
            },
        )
    }

    fn blank(source: Source, title: impl Into<String>, details: ItemDetails) -> Self {
        Self {
            source,
            id: None,
            title: title.into(),
            location: None,
            start: None,
            end: None,
            start_date: None,
            end_date: None,
            duration_minutes: None,
            details,
        }
    }

    /// Builder pattern: set id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Builder pattern: set location (trimmed; blank becomes none)
    pub fn with_location(mut self, location: Option<&str>) -> Self {
        self.location = normalize_location(location);
        self
    }

    /// Builder pattern: set start datetime
    pub fn with_start(mut self, start: NaiveDateTime) -> Self {
        self.start = Some(start);
        self.start_date = Some(start.date());
        self
    }

    /// Builder pattern: set end datetime, computing duration when start is known
    pub fn with_end(mut self, end: NaiveDateTime) -> Self {
        self.end = Some(end);
        self.end_date = Some(end.date());
        if let Some(start) = self.start {
            self.duration_minutes = Some((end - start).num_minutes());
        }
        self
    }

    /// Builder pattern: set date without a time of day
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Builder pattern: set end date without a time of day
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Builder pattern: replace details
    pub fn with_details(mut self, details: ItemDetails) -> Self {
        self.details = details;
        self
    }

    /// Calendar day the item falls on
    pub fn date(&self) -> Option<NaiveDate> {
        self.start.map(|dt| dt.date()).or(self.start_date)
    }

    /// Start time like "07:00 PM"
    pub fn start_time_label(&self) -> Option<String> {
        self.start.map(|dt| dt.format("%I:%M %p").to_string())
    }

    /// End time like "09:00 PM"
    pub fn end_time_label(&self) -> Option<String> {
        self.end.map(|dt| dt.format("%I:%M %p").to_string())
    }

    /// "07:00 PM - 09:00 PM", "07:00 PM", or "All day"
    pub fn time_range_label(&self) -> String {
        match (self.start_time_label(), self.end_time_label()) {
            (Some(start), Some(end)) => format!("{} - {}", start, end),
            (Some(start), None) => start,
            _ => "All day".to_string(),
        }
    }

    /// Access for events, booking status for reservations
    pub fn status_label(&self) -> &str {
        match &self.details {
            ItemDetails::Event { access, .. } => access.label(),
            ItemDetails::Reservation { status, .. } => status.as_str(),
        }
    }

    pub fn is_event(&self) -> bool {
        matches!(self.details, ItemDetails::Event { .. })
    }
}

/// Trim a location name; empty input becomes `None`
pub fn normalize_location(location: Option<&str>) -> Option<String> {
    location
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
