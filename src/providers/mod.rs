//! Calendar feed providers
//!
//! Each feed implements [`FeedProvider`] and yields normalized
//! [`ScheduleItem`]s. [`fetch_all`] queries every feed concurrently and
//! degrades a failing feed to an empty list.

pub mod skedda;
pub mod wild_apricot;

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::core::{apply, merge, organize_by_date, DayGroup, DisplayParams, ScheduleItem, Source};
use crate::settings::Settings;

pub use skedda::SkeddaProvider;
pub use wild_apricot::WildApricotProvider;

/// User agent sent with every feed request
pub const USER_AGENT: &str = concat!("signboard/", env!("CARGO_PKG_VERSION"));

/// Feed identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    WildApricot,
    Skedda,
}

impl ProviderId {
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::WildApricot => "Wild Apricot",
            ProviderId::Skedda => "Skedda",
        }
    }

    pub fn source(&self) -> Source {
        match self {
            ProviderId::WildApricot => Source::WildApricot,
            ProviderId::Skedda => Source::Skedda,
        }
    }
}

/// Errors a feed fetch can fail with
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Feed returned HTTP status {0}")]
    Status(u16),

    #[error("Failed to parse feed: {0}")]
    Parse(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Other(String),
}

/// Per-request fetch options
#[derive(Debug, Clone)]
pub struct FetchContext {
    pub timeout: Duration,
    pub user_agent: String,
}

impl FetchContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            user_agent: USER_AGENT.to_string(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.fetch_timeout())
    }

    /// HTTP client honouring this context's timeout and user agent
    pub fn client(&self) -> Result<reqwest::Client, ProviderError> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| ProviderError::Other(e.to_string()))
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new(Duration::from_secs(10))
    }
}

/// A calendar feed
#[async_trait]
pub trait FeedProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Fetch and normalize all entries from the feed
    async fn fetch_items(&self, ctx: &FetchContext) -> Result<Vec<ScheduleItem>, ProviderError>;
}

/// Issue a GET and return the body text, mapping non-2xx to [`ProviderError::Status`]
pub(crate) async fn get_text(url: &str, ctx: &FetchContext) -> Result<String, ProviderError> {
    let resp = ctx.client()?.get(url).send().await?;

    if !resp.status().is_success() {
        return Err(ProviderError::Status(resp.status().as_u16()));
    }

    Ok(resp.text().await?)
}

/// Events and reservations fetched in one pass
#[derive(Debug, Clone, Default)]
pub struct FeedSnapshot {
    pub events: Vec<ScheduleItem>,
    pub reservations: Vec<ScheduleItem>,
}

impl FeedSnapshot {
    /// Every item, events first
    pub fn into_items(self) -> Vec<ScheduleItem> {
        merge(self.events, self.reservations)
    }
}

/// Configured feed set
pub struct Feeds {
    providers: Vec<Box<dyn FeedProvider>>,
}

impl Feeds {
    pub fn new(providers: Vec<Box<dyn FeedProvider>>) -> Self {
        Self { providers }
    }

    /// Both feeds at the URLs named in settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(vec![
            Box::new(WildApricotProvider::new(&settings.wild_apricot_url)),
            Box::new(SkeddaProvider::new(&settings.skedda_ical_url)),
        ])
    }

    /// Fetch every feed concurrently
    pub async fn fetch_all(&self, ctx: &FetchContext) -> FeedSnapshot {
        fetch_all(&self.providers, ctx).await
    }

    /// Fetch, filter and group everything one view shows
    pub async fn schedule(
        &self,
        ctx: &FetchContext,
        params: &DisplayParams,
        today: NaiveDate,
    ) -> Vec<DayGroup> {
        let items = self.fetch_all(ctx).await.into_items();
        organize_by_date(apply(params, items, today))
    }
}

/// Fetch every provider concurrently, each bounded by the context timeout.
///
/// A failed or timed-out feed is logged and contributes nothing; the
/// others are still returned.
pub async fn fetch_all(providers: &[Box<dyn FeedProvider>], ctx: &FetchContext) -> FeedSnapshot {
    let fetches = providers.iter().map(|provider| async move {
        let id = provider.id();
        let result = match tokio::time::timeout(ctx.timeout, provider.fetch_items(ctx)).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(ctx.timeout)),
        };
        (id, result)
    });

    let mut snapshot = FeedSnapshot::default();
    for (id, result) in futures::future::join_all(fetches).await {
        match result {
            Ok(items) => {
                tracing::info!("Fetched {} items from {}", items.len(), id.display_name());
                match id.source() {
                    Source::WildApricot => snapshot.events.extend(items),
                    Source::Skedda => snapshot.reservations.extend(items),
                }
            }
            Err(e) => {
                tracing::error!("Failed to fetch {} data: {}", id.display_name(), e);
            }
        }
    }

    snapshot
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StaticFeed {
        id: ProviderId,
        outcome: Result<usize, ()>,
        delay: Duration,
    }

    #[async_trait]
    impl FeedProvider for StaticFeed {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn fetch_items(&self, _ctx: &FetchContext) -> Result<Vec<ScheduleItem>, ProviderError> {
            tokio::time::sleep(self.delay).await;
            match self.outcome {
                Ok(n) => Ok((0..n)
                    .map(|i| match self.id {
                        ProviderId::WildApricot => ScheduleItem::event(format!("event {}", i)),
                        ProviderId::Skedda => ScheduleItem::reservation(format!("booking {}", i)),
                    })
                    .collect()),
                Err(()) => Err(ProviderError::Status(503)),
            }
        }
    }

    fn feed(id: ProviderId, outcome: Result<usize, ()>, delay_secs: u64) -> Box<dyn FeedProvider> {
        Box::new(StaticFeed {
            id,
            outcome,
            delay: Duration::from_secs(delay_secs),
        })
    }

    #[tokio::test]
    async fn test_fetch_all_combines_sources() {
        let feeds = Feeds::new(vec![
            feed(ProviderId::WildApricot, Ok(2), 0),
            feed(ProviderId::Skedda, Ok(3), 0),
        ]);
        let snapshot = feeds.fetch_all(&FetchContext::default()).await;
        assert_eq!(snapshot.events.len(), 2);
        assert_eq!(snapshot.reservations.len(), 3);

        let items = snapshot.into_items();
        assert_eq!(items[0].title, "event 0");
        assert_eq!(items[4].title, "booking 2");
    }

    #[tokio::test]
    async fn test_failing_feed_degrades_to_empty() {
        let feeds = Feeds::new(vec![
            feed(ProviderId::WildApricot, Err(()), 0),
            feed(ProviderId::Skedda, Ok(1), 0),
        ]);
        let snapshot = feeds.fetch_all(&FetchContext::default()).await;
        assert!(snapshot.events.is_empty());
        assert_eq!(snapshot.reservations.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_feed_times_out() {
        let feeds = Feeds::new(vec![
            feed(ProviderId::WildApricot, Ok(1), 60),
            feed(ProviderId::Skedda, Ok(1), 1),
        ]);
        let snapshot = feeds.fetch_all(&FetchContext::new(Duration::from_secs(10))).await;
        assert!(snapshot.events.is_empty());
        assert_eq!(snapshot.reservations.len(), 1);
    }

    #[tokio::test]
    async fn test_schedule_filters_and_groups() {
        let feeds = Feeds::new(vec![
            feed(ProviderId::WildApricot, Ok(2), 0),
            feed(ProviderId::Skedda, Ok(1), 0),
        ]);
        let today = NaiveDate::from_ymd_opt(2026, 1, 12).unwrap();

        // Stub items are undated, so they land in a single trailing group
        let all = feeds
            .schedule(&FetchContext::default(), &DisplayParams::with_defaults(true), today)
            .await;
        assert_eq!(all.len(), 1);
        assert!(all[0].date.is_none());
        assert_eq!(all[0].items.len(), 3);

        let params = DisplayParams::from_query("source=skedda", true);
        let only = feeds.schedule(&FetchContext::default(), &params, today).await;
        assert_eq!(only[0].items.len(), 1);
        assert_eq!(only[0].items[0].title, "booking 0");
    }

    #[test]
    fn test_error_display() {
        assert!(ProviderError::Status(404).to_string().contains("404"));
        assert!(ProviderError::Parse("bad json".into()).to_string().contains("bad json"));
    }
}
