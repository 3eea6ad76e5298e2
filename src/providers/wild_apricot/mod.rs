//! Wild Apricot provider implementation
//!
//! Reads the digital-sign event feed, a JSON document of the form
//! `{"generated_at": "...", "events": [...]}`

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;

use super::{get_text, FeedProvider, FetchContext, ProviderError, ProviderId};
use crate::core::{parse_date, AccessStatus, ItemDetails, ScheduleItem};

#[derive(Debug, Deserialize)]
struct FeedDocument {
    #[serde(default)]
    generated_at: Option<String>,
    #[serde(default)]
    events: Option<Vec<serde_json::Value>>,
}

/// One event as published by the feed
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawEvent {
    uid: Option<serde_json::Value>,
    name: Option<String>,
    location: Option<String>,
    event_type: Option<String>,
    start_date: Option<String>,
    registrations_limit: Option<u32>,
    confirmed_registrations_count: Option<u32>,
    active_registrations_count: Option<u32>,
    pending_registrations_count: Option<u32>,
}

impl RawEvent {
    fn uid(&self) -> Option<String> {
        match self.uid.as_ref()? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Normalize into a schedule item. Events without a name are dropped.
    fn into_item(self) -> Option<ScheduleItem> {
        let name = self.name.as_deref().map(str::trim).unwrap_or("");
        if name.is_empty() {
            return None;
        }

        let active = self.active_registrations_count.unwrap_or(0);
        let details = ItemDetails::Event {
            event_type: self.event_type.clone().filter(|t| !t.is_empty()),
            access: AccessStatus::derive(name, self.registrations_limit, active),
            capacity: self.registrations_limit,
            enrollment: active,
            confirmed: self.confirmed_registrations_count.unwrap_or(0),
            pending: self.pending_registrations_count.unwrap_or(0),
        };

        let mut item = ScheduleItem::event(name)
            .with_location(self.location.as_deref())
            .with_details(details);
        if let Some(uid) = self.uid() {
            item = item.with_id(uid);
        }

        if let Some(raw) = self.start_date.as_deref() {
            match parse_start(raw) {
                Some(StartValue::DateTime(dt)) => item = item.with_start(dt),
                Some(StartValue::Date(date)) => item = item.with_start_date(date),
                None => tracing::debug!("Could not parse datetime '{}'", raw),
            }
        }

        Some(item)
    }
}

enum StartValue {
    DateTime(NaiveDateTime),
    Date(chrono::NaiveDate),
}

/// Parse the feed's start value, keeping the wall-clock time it was
/// published in. Accepts `2026-01-12T19:00:00.000-05:00`, offset-less
/// datetimes, and bare dates.
fn parse_start(raw: &str) -> Option<StartValue> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(StartValue::DateTime(dt.naive_local()));
    }

    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(StartValue::DateTime(dt));
        }
    }

    parse_date(raw).ok().map(StartValue::Date)
}

/// Parse a feed document into schedule items, skipping malformed entries
pub fn parse_feed(body: &str) -> Result<Vec<ScheduleItem>, ProviderError> {
    let doc: FeedDocument = serde_json::from_str(body)
        .map_err(|e| ProviderError::Parse(format!("Failed to parse JSON response: {}", e)))?;

    let Some(raw_events) = doc.events else {
        tracing::warn!("No 'events' key found in API response");
        return Ok(Vec::new());
    };

    if let Some(generated_at) = doc.generated_at.as_deref() {
        tracing::debug!("Wild Apricot feed generated at {}", generated_at);
    }

    let mut items = Vec::with_capacity(raw_events.len());
    for value in raw_events {
        match serde_json::from_value::<RawEvent>(value) {
            Ok(raw) => items.extend(raw.into_item()),
            Err(e) => tracing::warn!("Error parsing event: {}", e),
        }
    }

    Ok(items)
}

/// Wild Apricot events feed
pub struct WildApricotProvider {
    url: String,
}

impl WildApricotProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl FeedProvider for WildApricotProvider {
    fn id(&self) -> ProviderId {
        ProviderId::WildApricot
    }

    async fn fetch_items(&self, ctx: &FetchContext) -> Result<Vec<ScheduleItem>, ProviderError> {
        tracing::debug!("Fetching Wild Apricot events from {}", self.url);

        let body = get_text(&self.url, ctx).await?;
        let items = parse_feed(&body)?;

        tracing::info!("Successfully fetched {} events from Wild Apricot API", items.len());
        Ok(items)
    }
}
