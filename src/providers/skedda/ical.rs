//! Minimal iCalendar (RFC 5545) reader
//!
//! Handles what a booking feed publishes: line folding, property
//! parameters (quoted or not), nested components, and DATE / DATE-TIME
//! values. Recurrence rules and time zone definitions are not interpreted.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// A content line: `NAME;PARAM=VALUE:value`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Property {
    pub name: String,
    pub params: Vec<(String, String)>,
    pub value: String,
}

impl Property {
    /// Parameter value by case-insensitive name
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A `BEGIN:X` .. `END:X` block's own properties (nested blocks excluded)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Component {
    pub name: String,
    pub properties: Vec<Property>,
}

impl Component {
    /// First property with this name
    pub fn get(&self, name: &str) -> Option<&Property> {
        self.properties
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
    }

    /// Every value of a repeatable property
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Property> + 'a {
        self.properties
            .iter()
            .filter(move |p| p.name.eq_ignore_ascii_case(name))
    }
}

/// Join folded lines: a line starting with a space or tab continues the previous one
pub fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = line.strip_prefix(' ').or_else(|| line.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    lines
}

/// Split one unfolded content line. Returns `None` when there is no `:`.
pub fn parse_property(line: &str) -> Option<Property> {
    let mut in_quotes = false;
    let mut value_start = None;
    for (idx, c) in line.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ':' if !in_quotes => {
                value_start = Some(idx);
                break;
            }
            _ => {}
        }
    }
    let colon = value_start?;
    let (head, value) = (&line[..colon], &line[colon + 1..]);

    let mut segments = split_unquoted(head, ';').into_iter();
    let name = segments.next()?.trim().to_uppercase();
    if name.is_empty() {
        return None;
    }

    let params = segments
        .filter_map(|seg| {
            let (k, v) = seg.split_once('=')?;
            Some((k.trim().to_uppercase(), v.trim().trim_matches('"').to_string()))
        })
        .collect();

    Some(Property {
        name,
        params,
        value: value.to_string(),
    })
}

fn split_unquoted(s: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, c) in s.char_indices() {
        if c == '"' {
            in_quotes = !in_quotes;
        } else if c == sep && !in_quotes {
            parts.push(&s[start..idx]);
            start = idx + c.len_utf8();
        }
    }
    parts.push(&s[start..]);
    parts
}

/// All components named `kind` (e.g. `VEVENT`), wherever they are nested
pub fn components(text: &str, kind: &str) -> Vec<Component> {
    let mut stack: Vec<Component> = Vec::new();
    let mut found = Vec::new();

    for line in unfold(text) {
        let Some(prop) = parse_property(&line) else {
            tracing::debug!("Skipping malformed iCal line: {}", line);
            continue;
        };

        match prop.name.as_str() {
            "BEGIN" => stack.push(Component {
                name: prop.value.trim().to_uppercase(),
                properties: Vec::new(),
            }),
            "END" => {
                if let Some(done) = stack.pop() {
                    if done.name.eq_ignore_ascii_case(kind) {
                        found.push(done);
                    }
                }
            }
            _ => {
                if let Some(current) = stack.last_mut() {
                    current.properties.push(prop);
                }
            }
        }
    }

    found
}

/// A DTSTART/DTEND value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IcalTime {
    /// `VALUE=DATE`, all day
    Date(NaiveDate),
    /// Floating or `TZID=` local time; taken at face value
    Local(NaiveDateTime),
    /// Trailing `Z`
    Utc(DateTime<Utc>),
}

impl IcalTime {
    pub fn parse(prop: &Property) -> Option<Self> {
        let value = prop.value.trim();

        let is_date = prop
            .param("VALUE")
            .is_some_and(|v| v.eq_ignore_ascii_case("DATE"))
            || (value.len() == 8 && value.bytes().all(|b| b.is_ascii_digit()));
        if is_date {
            return NaiveDate::parse_from_str(value, "%Y%m%d")
                .ok()
                .map(IcalTime::Date);
        }

        if let Some(utc) = value.strip_suffix('Z') {
            return NaiveDateTime::parse_from_str(utc, "%Y%m%dT%H%M%S")
                .ok()
                .map(|dt| IcalTime::Utc(Utc.from_utc_datetime(&dt)));
        }

        NaiveDateTime::parse_from_str(value, "%Y%m%dT%H%M%S")
            .ok()
            .map(IcalTime::Local)
    }

    /// Wall-clock datetime on this machine; `None` for all-day values
    pub fn to_local_naive(&self) -> Option<NaiveDateTime> {
        match self {
            IcalTime::Date(_) => None,
            IcalTime::Local(dt) => Some(*dt),
            IcalTime::Utc(dt) => Some(dt.with_timezone(&Local).naive_local()),
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            IcalTime::Date(d) => *d,
            IcalTime::Local(dt) => dt.date(),
            IcalTime::Utc(dt) => dt.with_timezone(&Local).date_naive(),
        }
    }
}
