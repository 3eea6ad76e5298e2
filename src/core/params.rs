//! Display parameters parsed from the request query string

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::dates::{parse_date, DateRange};
use super::item::Source;

/// Page layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Kiosk,
    Mobile,
    #[default]
    Desktop,
    Print,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Kiosk => "kiosk",
            Format::Mobile => "mobile",
            Format::Desktop => "desktop",
            Format::Print => "print",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "kiosk" => Some(Format::Kiosk),
            "mobile" => Some(Format::Mobile),
            "desktop" => Some(Format::Desktop),
            "print" => Some(Format::Print),
            _ => None,
        }
    }
}

/// Which feeds to show
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceFilter {
    #[default]
    All,
    Only(Source),
}

impl SourceFilter {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceFilter::All => "all",
            SourceFilter::Only(source) => source.as_str(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let lower = s.trim().to_lowercase();
        if lower == "all" {
            return Some(SourceFilter::All);
        }
        Source::from_str_opt(&lower).map(SourceFilter::Only)
    }

    pub fn admits(&self, source: Source) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Only(only) => *only == source,
        }
    }
}

/// Validated view parameters.
///
/// Unknown keys and out-of-set values are ignored; bad dates are logged
/// and dropped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DisplayParams {
    pub date: Option<NaiveDate>,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub range: Option<DateRange>,
    /// Location or space filter; the two keys are synonyms
    pub location: Option<String>,
    pub source: SourceFilter,
    pub format: Format,
    pub filter_past: bool,
}

impl DisplayParams {
    /// Defaults used before any query parameter is applied
    pub fn with_defaults(filter_past: bool) -> Self {
        Self {
            filter_past,
            ..Default::default()
        }
    }

    /// Parse a raw query string (without the leading `?`)
    pub fn from_query(query: &str, filter_past_default: bool) -> Self {
        Self::from_pairs(
            url::form_urlencoded::parse(query.as_bytes()).map(|(k, v)| (k.into_owned(), v.into_owned())),
            filter_past_default,
        )
    }

    /// Build from decoded key/value pairs. The first occurrence of a key wins.
    pub fn from_pairs<I>(pairs: I, filter_past_default: bool) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut lookup: Vec<(String, String)> = Vec::new();
        for (k, v) in pairs {
            if !lookup.iter().any(|(existing, _)| *existing == k) {
                lookup.push((k, v));
            }
        }
        let get = |key: &str| {
            lookup
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        let mut params = Self::with_defaults(filter_past_default);

        params.date = get("date").and_then(|v| parse_date_param("date", v));
        params.start = get("start").and_then(|v| parse_date_param("start", v));
        params.end = get("end").and_then(|v| parse_date_param("end", v));
        params.range = get("range").and_then(DateRange::parse);

        params.location = get("location")
            .or_else(|| get("space"))
            .map(|v| v.trim().to_string());

        if let Some(source) = get("source").and_then(SourceFilter::parse) {
            params.source = source;
        }
        if let Some(format) = get("format").and_then(Format::parse) {
            params.format = format;
        }
        if let Some(flag) = get("filter_past").and_then(parse_bool) {
            params.filter_past = flag;
        }

        params
    }

    /// Render back to a query string, for links between formats
    pub fn to_query(&self) -> String {
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        if let Some(date) = self.date {
            out.append_pair("date", &date.format("%Y-%m-%d").to_string());
        }
        if let Some(start) = self.start {
            out.append_pair("start", &start.format("%Y-%m-%d").to_string());
        }
        if let Some(end) = self.end {
            out.append_pair("end", &end.format("%Y-%m-%d").to_string());
        }
        if let Some(range) = self.range {
            out.append_pair("range", range.as_str());
        }
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            out.append_pair("location", location);
        }
        if self.source != SourceFilter::All {
            out.append_pair("source", self.source.as_str());
        }
        out.append_pair("format", self.format.as_str());
        out.finish()
    }

    /// Human-readable summary of the active filters
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(date) = self.date {
            parts.push(date.format("%A, %B %-d, %Y").to_string());
        } else if let Some(range) = self.range {
            parts.push(range.label().to_string());
        } else {
            match (self.start, self.end) {
                (Some(s), Some(e)) => parts.push(format!("{} to {}", s, e)),
                (Some(s), None) => parts.push(format!("From {}", s)),
                (None, Some(e)) => parts.push(format!("Through {}", e)),
                (None, None) => parts.push("All upcoming".to_string()),
            }
        }
        if let Some(location) = self.location.as_deref().filter(|l| !l.is_empty()) {
            parts.push(format!("at {}", location));
        }
        if let SourceFilter::Only(source) = self.source {
            parts.push(format!("({})", source.display_name()));
        }
        parts.join(" ")
    }
}

fn parse_date_param(name: &str, value: &str) -> Option<NaiveDate> {
    match parse_date(value) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::warn!("Invalid {} parameter: {}", name, e);
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
