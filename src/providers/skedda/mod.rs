//! Skedda provider implementation
//!
//! Reads space reservations from a Skedda iCal export

mod ical;
mod text;

use async_trait::async_trait;

use super::{get_text, FeedProvider, FetchContext, ProviderError, ProviderId};
use crate::core::{ItemDetails, ScheduleItem};

use ical::{components, Component, IcalTime};
use text::clean_ical_text;

/// Marker Skedda puts before the booked space in descriptions
const SPACES_MARKER: &str = "Spaces:";

/// Title used when a reservation only names its space
const DEFAULT_TITLE: &str = "Reservation";

/// Turn one VEVENT into a reservation.
///
/// Returns `None` when the event has neither a title nor a space.
fn parse_vevent(event: &Component) -> Option<ScheduleItem> {
    let text = |name: &str| event.get(name).and_then(|p| clean_ical_text(&p.value));

    let title = text("SUMMARY");
    let description = text("DESCRIPTION");

    let mut space = description
        .as_deref()
        .and_then(|desc| desc.rsplit_once(SPACES_MARKER))
        .map(|(_, tail)| tail.trim().to_string())
        .filter(|s| !s.is_empty());

    // RESOURCES is the authoritative space when present; it may repeat
    let resources: Vec<String> = event
        .get_all("RESOURCES")
        .filter_map(|p| clean_ical_text(&p.value))
        .collect();
    if !resources.is_empty() {
        space = Some(resources.join(", "));
    }

    if title.is_none() && space.is_none() {
        return None;
    }

    let status = text("STATUS").unwrap_or_else(|| "CONFIRMED".to_string());
    let mut item = ScheduleItem::reservation(title.as_deref().unwrap_or(DEFAULT_TITLE))
        .with_location(space.as_deref())
        .with_details(ItemDetails::Reservation {
            status,
            description,
        });

    if let Some(uid) = event.get("UID").map(|p| p.value.trim()).filter(|u| !u.is_empty()) {
        item = item.with_id(uid);
    }

    if let Some(start) = event.get("DTSTART").and_then(IcalTime::parse) {
        item = match start.to_local_naive() {
            Some(dt) => item.with_start(dt),
            None => item.with_start_date(start.date()),
        };
    }

    if let Some(end) = event.get("DTEND").and_then(IcalTime::parse) {
        item = match end.to_local_naive() {
            Some(dt) => item.with_end(dt),
            None => item.with_end_date(end.date()),
        };
    }

    Some(item)
}

/// Parse an iCal document into reservations
pub fn parse_calendar(body: &str) -> Result<Vec<ScheduleItem>, ProviderError> {
    if !body.contains("BEGIN:VCALENDAR") {
        return Err(ProviderError::Parse(
            "Response is not an iCalendar document".to_string(),
        ));
    }

    let events = components(body, "VEVENT");
    let total = events.len();
    let items: Vec<ScheduleItem> = events.iter().filter_map(parse_vevent).collect();

    if items.len() < total {
        tracing::debug!("Skipped {} VEVENTs without title or space", total - items.len());
    }
    Ok(items)
}

/// Skedda iCal reservations feed
pub struct SkeddaProvider {
    url: String,
}

impl SkeddaProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl FeedProvider for SkeddaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Skedda
    }

    async fn fetch_items(&self, ctx: &FetchContext) -> Result<Vec<ScheduleItem>, ProviderError> {
        tracing::debug!("Fetching Skedda reservations");

        let body = get_text(&self.url, ctx).await?;
        let items = parse_calendar(&body)?;

        tracing::info!("Successfully fetched {} reservations from Skedda", items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SAMPLE: &str = "BEGIN:VCALENDAR\r\n\
VERSION:2.0\r\n\
PRODID:-//Skedda//EN\r\n\
BEGIN:VEVENT\r\n\
UID:sk-1001\r\n\
SUMMARY:Robotics Club\r\n\
DESCRIPTION:Weekly meetup\\nSpaces: Events Bay Lounge\r\n\
DTSTART;TZID=America/New_York:20260112T190000\r\n\
DTEND;TZID=America/New_York:20260112T213000\r\n\
STATUS:CONFIRMED\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:sk-1002\r\n\
DESCRIPTION:Spaces: Classroom A\r\n\
RESOURCES:Woodshop\\, Bay 2\r\n\
DTSTART;VALUE=DATE:20260114\r\n\
DTEND;VALUE=DATE:20260115\r\n\
STATUS:TENTATIVE\r\n\
END:VEVENT\r\n\
BEGIN:VEVENT\r\n\
UID:sk-1003\r\n\
DTSTART:20260115T120000\r\n\
END:VEVENT\r\n\
END:VCALENDAR\r\n";

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_calendar() {
        let items = parse_calendar(SAMPLE).unwrap();
        assert_eq!(items.len(), 2);

        let club = &items[0];
        assert_eq!(club.id.as_deref(), Some("sk-1001"));
        assert_eq!(club.title, "Robotics Club");
        assert_eq!(club.location.as_deref(), Some("Events Bay Lounge"));
        assert_eq!(club.duration_minutes, Some(150));
        assert_eq!(club.time_range_label(), "07:00 PM - 09:30 PM");
        assert_eq!(club.status_label(), "CONFIRMED");

        let booking = &items[1];
        assert_eq!(booking.title, "Reservation");
        assert_eq!(booking.location.as_deref(), Some("Woodshop, Bay 2"));
        assert_eq!(booking.date(), Some(d(2026, 1, 14)));
        assert_eq!(booking.end_date, Some(d(2026, 1, 15)));
        assert!(booking.start.is_none());
        assert_eq!(booking.status_label(), "TENTATIVE");
    }

    #[test]
    fn test_missing_status_defaults_to_confirmed() {
        let event = components(
            "BEGIN:VCALENDAR\nBEGIN:VEVENT\nSUMMARY:Open Shop\nEND:VEVENT\nEND:VCALENDAR\n",
            "VEVENT",
        );
        let item = parse_vevent(&event[0]).unwrap();
        assert_eq!(item.status_label(), "CONFIRMED");
        assert!(item.date().is_none());
    }

    #[test]
    fn test_not_a_calendar() {
        assert!(matches!(
            parse_calendar("<html>login</html>"),
            Err(ProviderError::Parse(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_items_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(query_param("k", "secret"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/calendar")
                    .set_body_string(SAMPLE),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = SkeddaProvider::new(format!("{}/ical?k=secret&i=1", server.uri()));
        let items = provider.fetch_items(&FetchContext::default()).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(provider.id(), ProviderId::Skedda);
    }
}
