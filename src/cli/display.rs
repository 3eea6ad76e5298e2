//! Display command implementation
//!
//! Renders a `/display` view to the terminal. A kiosk query keeps the view
//! on screen and re-renders it each time the auto-reload timer fires.

use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use chrono::Local;
use clap::Args;
use tokio::sync::mpsc;

use crate::core::{DayGroup, DisplayParams, Format};
use crate::kiosk::{AutoReloader, MatchMode, PageHost, TokioScheduler};
use crate::providers::{FetchContext, Feeds};
use crate::settings::Settings;

/// Arguments for the display command
#[derive(Args, Debug, Default)]
pub struct DisplayArgs {
    /// Query string as used on /display, e.g. "range=today&format=kiosk"
    #[arg(default_value = "")]
    pub query: String,

    /// Output JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Terminal stand-in for a browser page. Reloads are handed to the render
/// loop over a channel.
struct TerminalPage {
    href: String,
    reloads: mpsc::UnboundedSender<String>,
}

impl TerminalPage {
    fn new(base_url: &str, query: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let href = if query.is_empty() {
            format!("{}/display", base_url)
        } else {
            format!("{}/display?{}", base_url, query)
        };
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { href, reloads: tx }), rx)
    }
}

impl PageHost for TerminalPage {
    fn href(&self) -> String {
        self.href.clone()
    }

    fn search(&self) -> String {
        match self.href.find('?') {
            Some(idx) => self.href[idx..].to_string(),
            None => String::new(),
        }
    }

    fn reload(&self, href: &str) {
        if self.reloads.send(href.to_string()).is_err() {
            tracing::debug!("Render loop gone, dropping reload of {}", href);
        }
    }
}

/// Run the display command
pub async fn run(args: DisplayArgs, settings: Settings) -> anyhow::Result<()> {
    let query = args.query.trim().trim_start_matches('?').to_string();
    let base_url = local_base_url(&settings);

    let feeds = Feeds::from_settings(&settings);
    let ctx = FetchContext::from_settings(&settings);
    let params = DisplayParams::from_query(&query, settings.filter_past_events);
    let scheduler =
        TokioScheduler::current().ok_or_else(|| anyhow!("display must run inside a tokio runtime"))?;

    let (page, reloads) = TerminalPage::new(&base_url, &query);
    let json = args.json;
    let (feeds, ctx, params) = (&feeds, &ctx, &params);

    let renders = kiosk_loop(
        page,
        reloads,
        scheduler,
        settings.kiosk_match,
        move || async move {
            let groups = feeds.schedule(ctx, params, Local::now().date_naive()).await;
            print_view(&groups, params, json)
        },
        async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::warn!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        },
    )
    .await?;

    tracing::debug!("Display rendered {} time(s)", renders);
    Ok(())
}

/// Base URL a local viewer can open. Wildcard bind hosts become `localhost`.
fn local_base_url(settings: &Settings) -> String {
    if let Some(url) = &settings.public_base_url {
        return url.trim_end_matches('/').to_string();
    }
    let (host, port) = match settings.bind.rsplit_once(':') {
        Some((host, port)) => (host, Some(port)),
        None => (settings.bind.as_str(), None),
    };
    let host = match host {
        "" | "0.0.0.0" | "::" | "[::]" => "localhost",
        other => other,
    };
    match port {
        Some(port) => format!("http://{}:{}", host, port),
        None => format!("http://{}", host),
    }
}

/// Render, arm the reloader, and render again each time it fires.
///
/// Returns the number of renders once the page is not a kiosk page, the
/// reload channel closes, or `shutdown` completes.
async fn kiosk_loop<R, Fut, S>(
    page: Arc<TerminalPage>,
    mut reloads: mpsc::UnboundedReceiver<String>,
    scheduler: TokioScheduler,
    mode: MatchMode,
    mut render: R,
    shutdown: S,
) -> anyhow::Result<usize>
where
    R: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut renders = 0;

    loop {
        render().await?;
        renders += 1;

        let reloader = AutoReloader::new(Arc::clone(&page), scheduler.clone()).with_mode(mode);
        let Some(timer) = reloader.init() else {
            return Ok(renders);
        };

        tokio::select! {
            reload = reloads.recv() => match reload {
                Some(href) => tracing::debug!("Re-rendering {}", href),
                None => return Ok(renders),
            },
            _ = &mut shutdown => {
                timer.abort();
                tracing::info!("Display stopped");
                return Ok(renders);
            }
        }
    }
}

fn print_view(groups: &[DayGroup], params: &DisplayParams, json: bool) -> anyhow::Result<()> {
    if json {
        let out = serde_json::json!({
            "filters": params.describe(),
            "format": params.format.as_str(),
            "generated_at": Local::now().naive_local(),
            "days": groups
                .iter()
                .map(|g| serde_json::json!({ "heading": g.heading(), "date": g.date, "items": g.items }))
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if params.format == Format::Kiosk {
        // Clear screen and home the cursor
        print!("\x1b[2J\x1b[H");
    }
    print!("{}", format_text(groups, params));
    Ok(())
}

/// Plain-text rendition of a view
fn format_text(groups: &[DayGroup], params: &DisplayParams) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Events & Reservations - {}", params.describe());

    if groups.is_empty() {
        out.push_str("\nNo events or reservations match this view.\n");
        return out;
    }

    for group in groups {
        let _ = writeln!(out, "\n{}", group.heading());
        for item in &group.items {
            let _ = write!(out, "  {:<21} {}", item.time_range_label(), item.title);
            if let Some(location) = &item.location {
                let _ = write!(out, " @ {}", location);
            }
            let _ = writeln!(out, " [{}] ({})", item.status_label(), item.source.display_name());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{organize_by_date, ScheduleItem};
    use crate::kiosk::RELOAD_DELAY;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_terminal_page_search() {
        let (page, _rx) = TerminalPage::new("http://board.local", "range=today&format=kiosk");
        assert_eq!(page.href(), "http://board.local/display?range=today&format=kiosk");
        assert_eq!(page.search(), "?range=today&format=kiosk");

        let (page, _rx) = TerminalPage::new("http://board.local", "");
        assert_eq!(page.search(), "");
    }

    #[test]
    fn test_local_base_url() {
        let mut settings = Settings::default();
        assert_eq!(local_base_url(&settings), "http://localhost:8000");

        settings.bind = "[::]:9000".to_string();
        assert_eq!(local_base_url(&settings), "http://localhost:9000");

        settings.bind = "192.168.1.20:8080".to_string();
        assert_eq!(local_base_url(&settings), "http://192.168.1.20:8080");

        settings.public_base_url = Some("https://board.example.org/".to_string());
        assert_eq!(local_base_url(&settings), "https://board.example.org");
    }

    #[test]
    fn test_format_text() {
        let start = NaiveDate::from_ymd_opt(2026, 1, 12)
            .unwrap()
            .and_hms_opt(19, 0, 0)
            .unwrap();
        let groups = organize_by_date(vec![ScheduleItem::reservation("Robotics Club")
            .with_start(start)
            .with_end(start + chrono::Duration::minutes(150))
            .with_location(Some("Events Bay Lounge"))]);
        let params = DisplayParams::from_query("format=kiosk", true);

        let text = format_text(&groups, &params);
        assert!(text.contains("Monday, January 12"));
        assert!(text.contains("07:00 PM - 09:30 PM"));
        assert!(text.contains("Robotics Club @ Events Bay Lounge [CONFIRMED] (Skedda)"));

        let empty = format_text(&[], &params);
        assert!(empty.contains("No events or reservations match this view."));
    }

    async fn count_renders(query: &str, mode: MatchMode, run_for: Duration) -> usize {
        let (page, reloads) = TerminalPage::new("http://board.local", query);
        let scheduler = TokioScheduler::current().unwrap();
        let counter = AtomicUsize::new(0);
        let renders = &counter;

        let total = kiosk_loop(
            page,
            reloads,
            scheduler,
            mode,
            move || async move {
                renders.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            tokio::time::sleep(run_for),
        )
        .await
        .unwrap();

        assert_eq!(total, renders.load(Ordering::SeqCst));
        total
    }

    #[tokio::test(start_paused = true)]
    async fn test_kiosk_rerenders_every_delay() {
        // Renders at 0, 5 and 10 minutes, stopped at 11
        let run_for = RELOAD_DELAY * 2 + Duration::from_secs(60);
        assert_eq!(count_renders("format=kiosk", MatchMode::Substring, run_for).await, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_kiosk_renders_once() {
        let run_for = RELOAD_DELAY * 3;
        assert_eq!(count_renders("range=today", MatchMode::Substring, run_for).await, 1);
        assert_eq!(count_renders("format=kiosk1", MatchMode::Parameter, run_for).await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_render_error_stops_loop() {
        let (page, reloads) = TerminalPage::new("http://board.local", "format=kiosk");
        let result = kiosk_loop(
            page,
            reloads,
            TokioScheduler::current().unwrap(),
            MatchMode::Substring,
            || async { Err(anyhow!("stdout closed")) },
            std::future::pending(),
        )
        .await;
        assert!(result.is_err());
    }
}
