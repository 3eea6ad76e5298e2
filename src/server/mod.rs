//! HTTP front end
//!
//! Routes:
//! - `/` and `/events`: master page with quick links and QR codes
//! - `/display`: filtered schedule in one of the four layouts
//! - `/static/js/main.js`: kiosk auto-reload script
//! - `/health`: liveness probe

use std::sync::{Arc, OnceLock};

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use axum::{Json, Router};
use chrono::Local;
use regex_lite::Regex;
use thiserror::Error;

use crate::core::DisplayParams;
use crate::kiosk::{browser_script, decide};
use crate::providers::{FetchContext, Feeds};
use crate::render::{
    display_page, error_page, master_page, DisplayView, MasterView, QrGenerator, QuickLink,
    QUICK_LINKS,
};
use crate::settings::Settings;

/// Host used in links when the request carries no usable `Host` header
const FALLBACK_HOST: &str = "localhost";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// State shared by every handler
pub struct AppState {
    pub settings: Settings,
    pub feeds: Feeds,
    pub qr: QrGenerator,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let feeds = Feeds::from_settings(&settings);
        Self::with_feeds(settings, feeds)
    }

    /// State with an explicit feed set
    pub fn with_feeds(settings: Settings, feeds: Feeds) -> Self {
        let qr = QrGenerator::new(settings.qr);
        Self {
            settings,
            feeds,
            qr,
        }
    }

    fn fetch_context(&self) -> FetchContext {
        FetchContext::from_settings(&self.settings)
    }
}

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(master))
        .route("/events", get(master))
        .route("/display", get(display))
        .route("/static/js/main.js", get(kiosk_script))
        .route("/health", get(health))
        .fallback(not_found)
        .with_state(state)
}

/// Bind and serve until Ctrl-C
pub async fn run(state: SharedState, bind: &str) -> Result<(), ServerError> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.to_string(),
            source,
        })?;
    let local_addr = listener.local_addr().map_err(ServerError::Serve)?;

    tracing::info!("signboard listening on http://{}", local_addr);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Could not listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}

fn host_pattern() -> Option<&'static Regex> {
    static HOST: OnceLock<Option<Regex>> = OnceLock::new();
    HOST.get_or_init(|| Regex::new(r"^(?:[A-Za-z0-9.\-]+|\[[0-9A-Fa-f:.]+\])(?::\d{1,5})?$").ok())
        .as_ref()
}

fn valid_host(host: &str) -> bool {
    host_pattern().is_some_and(|re| re.is_match(host))
}

/// Public base URL for links and QR codes, without a trailing slash.
///
/// The configured base URL wins; otherwise the scheme comes from
/// `X-Forwarded-Proto` and the authority from `Host`.
pub fn base_url(headers: &HeaderMap, settings: &Settings) -> String {
    if let Some(base) = &settings.public_base_url {
        return base.trim_end_matches('/').to_string();
    }

    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_lowercase())
        .filter(|v| v == "http" || v == "https")
        .unwrap_or_else(|| "http".to_string());

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| valid_host(h))
        .unwrap_or(FALLBACK_HOST);

    format!("{}://{}", scheme, host)
}

async fn master(State(state): State<SharedState>, headers: HeaderMap) -> Html<String> {
    let base = base_url(&headers, &state.settings);
    let snapshot = state.feeds.fetch_all(&state.fetch_context()).await;

    let links: Vec<QuickLink> = QUICK_LINKS
        .iter()
        .map(|spec| {
            let url = format!("{}{}", base, spec.path);
            QuickLink {
                spec: *spec,
                qr: state.qr.data_uri_or_log(&url),
                url,
            }
        })
        .collect();

    Html(master_page(&MasterView {
        events_count: snapshot.events.len(),
        reservations_count: snapshot.reservations.len(),
        links: &links,
        base_url: &base,
    }))
}

async fn display(State(state): State<SharedState>, uri: Uri, headers: HeaderMap) -> Html<String> {
    let query = uri.query().unwrap_or("");
    let params = DisplayParams::from_query(query, state.settings.filter_past_events);
    tracing::debug!(query = %query, format = params.format.as_str(), "Display request");

    let now = Local::now().naive_local();
    let groups = state
        .feeds
        .schedule(&state.fetch_context(), &params, now.date())
        .await;

    let path = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/display");
    let current_url = format!("{}{}", base_url(&headers, &state.settings), path);
    let qr = state.qr.data_uri_or_log(&current_url);

    // Same trigger the served script evaluates, independent of the layout
    let reload_script = decide(query, state.settings.kiosk_match).is_armed();

    Html(display_page(&DisplayView {
        groups: &groups,
        params: &params,
        qr: qr.as_deref(),
        current_url: &current_url,
        generated_at: now,
        reload_script,
    }))
}

async fn kiosk_script(State(state): State<SharedState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        browser_script(state.settings.kiosk_match),
    )
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok"
    }))
}

async fn not_found(uri: Uri) -> impl IntoResponse {
    tracing::debug!("404 for {}", uri);
    (StatusCode::NOT_FOUND, Html(error_page(404, "Page not found")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ScheduleItem;
    use crate::kiosk::MatchMode;
    use crate::providers::{FeedProvider, ProviderError, ProviderId};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct TodayFeed {
        id: ProviderId,
        fail: bool,
    }

    #[async_trait]
    impl FeedProvider for TodayFeed {
        fn id(&self) -> ProviderId {
            self.id
        }

        async fn fetch_items(&self, _ctx: &FetchContext) -> Result<Vec<ScheduleItem>, ProviderError> {
            if self.fail {
                return Err(ProviderError::Status(500));
            }
            let late = Local::now()
                .date_naive()
                .and_hms_opt(23, 59, 0)
                .unwrap();
            Ok(vec![match self.id {
                ProviderId::WildApricot => ScheduleItem::event("Laser Cutter Basics")
                    .with_start(late)
                    .with_location(Some("Laser Lab")),
                ProviderId::Skedda => ScheduleItem::reservation("Book Club")
                    .with_start(late)
                    .with_location(Some("Classroom A")),
            }])
        }
    }

    fn app_with(settings: Settings, skedda_fails: bool) -> Router {
        let feeds = Feeds::new(vec![
            Box::new(TodayFeed {
                id: ProviderId::WildApricot,
                fail: false,
            }),
            Box::new(TodayFeed {
                id: ProviderId::Skedda,
                fail: skedda_fails,
            }),
        ]);
        router(Arc::new(AppState::with_feeds(settings, feeds)))
    }

    fn app() -> Router {
        app_with(Settings::default(), false)
    }

    async fn get_page(app: Router, uri: &str) -> (StatusCode, HeaderMap, String) {
        let request = Request::builder()
            .uri(uri)
            .header(header::HOST, "board.local:8000")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, headers, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn test_kiosk_display_includes_script() {
        let (status, _, body) = get_page(app(), "/display?range=today&format=kiosk").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("<script src=\"/static/js/main.js\"></script>"));
        assert!(body.contains("Laser Cutter Basics"));
        assert!(body.contains("Book Club"));
        assert!(body.contains("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_desktop_display_has_no_script() {
        let (status, _, body) = get_page(app(), "/display?source=wild-apricot").await;
        assert_eq!(status, StatusCode::OK);
        assert!(!body.contains("main.js"));
        assert!(body.contains("Laser Cutter Basics"));
        assert!(!body.contains("Book Club"));
    }

    #[tokio::test]
    async fn test_script_follows_trigger_not_layout() {
        let has_script = |body: &str| body.contains("<script src=\"/static/js/main.js\"></script>");

        for query in ["xformat=kiosk", "format=kiosk123", "format=desktop&format=kiosk"] {
            let (_, _, body) = get_page(app(), &format!("/display?{}", query)).await;
            assert!(has_script(&body), "{} should load the reload script", query);
        }

        // Kiosk layout, but the trigger is case-sensitive
        let (_, _, body) = get_page(app(), "/display?format=KIOSK").await;
        assert!(body.contains("class=\"format-kiosk\""));
        assert!(!has_script(&body));

        let exact = || {
            app_with(
                Settings {
                    kiosk_match: MatchMode::Parameter,
                    ..Settings::default()
                },
                false,
            )
        };
        let (_, _, body) = get_page(exact(), "/display?format=kiosk123").await;
        assert!(!has_script(&body));
        let (_, _, body) = get_page(exact(), "/display?format=desktop&format=kiosk").await;
        assert!(has_script(&body));
    }

    #[tokio::test]
    async fn test_failing_feed_still_renders() {
        let (status, _, body) = get_page(app_with(Settings::default(), true), "/display").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("Laser Cutter Basics"));
        assert!(!body.contains("Book Club"));
    }

    #[tokio::test]
    async fn test_master_page_links() {
        for path in ["/", "/events"] {
            let (status, _, body) = get_page(app(), path).await;
            assert_eq!(status, StatusCode::OK);
            assert!(body.contains("1 events and 1 reservations"));
            assert!(body.contains("http://board.local:8000/display?range=today&amp;format=kiosk"));
        }
    }

    #[tokio::test]
    async fn test_script_route_follows_match_mode() {
        let (status, headers, body) = get_page(app(), "/static/js/main.js").await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/javascript"));
        assert!(body.contains("includes('format=kiosk')"));
        assert!(body.contains("300000"));

        let settings = Settings {
            kiosk_match: MatchMode::Parameter,
            ..Settings::default()
        };
        let (_, _, body) = get_page(app_with(settings, false), "/static/js/main.js").await;
        assert!(body.contains("URLSearchParams"));
    }

    #[tokio::test]
    async fn test_health_and_not_found() {
        let (status, _, body) = get_page(app(), "/health").await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");

        let (status, _, body) = get_page(app(), "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Page not found"));
    }

    #[test]
    fn test_base_url() {
        let settings = Settings::default();
        let mut headers = HeaderMap::new();
        assert_eq!(base_url(&headers, &settings), "http://localhost");

        headers.insert(header::HOST, "sign.example.org".parse().unwrap());
        headers.insert("x-forwarded-proto", "https, http".parse().unwrap());
        assert_eq!(base_url(&headers, &settings), "https://sign.example.org");

        headers.insert(header::HOST, "evil\"><script>".parse().unwrap());
        assert_eq!(base_url(&headers, &settings), "https://localhost");

        let configured = Settings {
            public_base_url: Some("https://board.example.org/".to_string()),
            ..Settings::default()
        };
        assert_eq!(base_url(&headers, &configured), "https://board.example.org");
    }
}
