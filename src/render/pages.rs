//! Page templates
//!
//! Pages are assembled as strings; every piece of feed or request text goes
//! through [`escape_html`].

use std::fmt::Write;

use chrono::NaiveDateTime;

use super::escape_html;
use crate::core::{DayGroup, DisplayParams, Format, ItemDetails, ScheduleItem};

/// Board name shown in page titles
pub const BOARD_TITLE: &str = "Events & Reservations";

/// Shortcut views offered on the master page
pub const QUICK_LINKS: [QuickLinkSpec; 3] = [
    QuickLinkSpec {
        key: "today_kiosk",
        label: "Today - Kiosk",
        path: "/display?range=today&format=kiosk",
    },
    QuickLinkSpec {
        key: "this_week_desktop",
        label: "This Week - Desktop",
        path: "/display?range=this-week&format=desktop",
    },
    QuickLinkSpec {
        key: "all_mobile",
        label: "All Upcoming - Mobile",
        path: "/display?format=mobile",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuickLinkSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub path: &'static str,
}

/// A quick link resolved against the public base URL
#[derive(Debug, Clone)]
pub struct QuickLink {
    pub spec: QuickLinkSpec,
    pub url: String,
    pub qr: Option<String>,
}

pub struct MasterView<'a> {
    pub events_count: usize,
    pub reservations_count: usize,
    pub links: &'a [QuickLink],
    pub base_url: &'a str,
}

pub struct DisplayView<'a> {
    pub groups: &'a [DayGroup],
    pub params: &'a DisplayParams,
    pub qr: Option<&'a str>,
    pub current_url: &'a str,
    pub generated_at: NaiveDateTime,
    /// Load the kiosk reload script; set when the query arms the reloader
    pub reload_script: bool,
}

const BASE_CSS: &str = "body{font-family:system-ui,sans-serif;margin:0;padding:1rem;color:#222}\
h1{margin:.2rem 0 1rem}h2{border-bottom:2px solid #ccc;padding-bottom:.2rem}\
ul.items{list-style:none;padding:0}li.item{padding:.4rem 0;border-bottom:1px solid #eee}\
.time{display:inline-block;min-width:11rem;font-weight:600}.location{color:#555}\
.badge{font-size:.8em;padding:.1rem .4rem;border-radius:.3rem;background:#eee;margin-left:.4rem}\
.status-full,.status-canceled{background:#f8d7da}.status-members-only{background:#fff3cd}\
.status-open{background:#d4edda}.qr img{width:160px;height:160px}.empty{color:#777}";

fn format_css(format: Format) -> &'static str {
    match format {
        Format::Kiosk => "body{background:#111;color:#f5f5f5;font-size:1.6rem}\
h2{border-color:#444}li.item{border-color:#333}.location{color:#bbb}\
.badge{color:#111}.qr{position:fixed;right:1rem;bottom:1rem;background:#fff;padding:.3rem}",
        Format::Mobile => "body{font-size:1rem;padding:.5rem}.time{display:block}",
        Format::Desktop => ".layout{display:flex;gap:2rem}.layout main{flex:1}nav a{margin-right:1rem}",
        Format::Print => "body{font-size:11pt}.badge{border:1px solid #999;background:none}nav{display:none}",
    }
}

fn layout(title: &str, format: Format, body: &str, reload_script: bool) -> String {
    let script = if reload_script {
        "<script src=\"/static/js/main.js\"></script>\n"
    } else {
        ""
    };
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n<style>{base}{extra}</style>\n</head>\n\
         <body class=\"format-{format}\">\n{body}\n{script}</body>\n</html>\n",
        title = escape_html(title),
        base = BASE_CSS,
        extra = format_css(format),
        format = format.as_str(),
        body = body,
        script = script,
    )
}

/// Landing page: feed counts plus quick links with QR codes
pub fn master_page(view: &MasterView<'_>) -> String {
    let mut body = String::new();
    let _ = writeln!(body, "<h1>{}</h1>", escape_html(BOARD_TITLE));
    let _ = writeln!(
        body,
        "<p class=\"summary\">{} events and {} reservations available.</p>",
        view.events_count, view.reservations_count
    );

    body.push_str("<ul class=\"links\">\n");
    for link in view.links {
        let _ = write!(
            body,
            "<li class=\"link link-{key}\"><a href=\"{url}\">{label}</a>",
            key = link.spec.key,
            url = escape_html(&link.url),
            label = escape_html(link.spec.label),
        );
        if let Some(qr) = &link.qr {
            let _ = write!(
                body,
                "<div class=\"qr\"><img src=\"{}\" alt=\"QR code for {}\"></div>",
                qr,
                escape_html(link.spec.label)
            );
        }
        body.push_str("</li>\n");
    }
    body.push_str("</ul>\n");

    let _ = writeln!(
        body,
        "<p class=\"help\">Build your own view at <code>{}/display</code> with \
         <code>range</code>, <code>date</code>, <code>start</code>, <code>end</code>, \
         <code>location</code>, <code>source</code> and <code>format</code>.</p>",
        escape_html(view.base_url)
    );

    layout(BOARD_TITLE, Format::Desktop, &body, false)
}

/// Filtered schedule in the layout chosen by `params.format`
pub fn display_page(view: &DisplayView<'_>) -> String {
    let format = view.params.format;
    let mut body = String::new();

    let _ = writeln!(
        body,
        "<header><h1>{}</h1><p class=\"filters\">{}</p></header>",
        escape_html(BOARD_TITLE),
        escape_html(&view.params.describe())
    );

    if matches!(format, Format::Desktop | Format::Mobile) {
        body.push_str(&format_nav(view.params));
    }

    let mut main = String::new();
    if view.groups.is_empty() {
        main.push_str("<p class=\"empty\">No events or reservations match this view.</p>\n");
    }
    for group in view.groups {
        let _ = writeln!(main, "<section class=\"day\"><h2>{}</h2>", escape_html(&group.heading()));
        main.push_str("<ul class=\"items\">\n");
        for item in &group.items {
            main.push_str(&render_item(item, format));
        }
        main.push_str("</ul></section>\n");
    }

    let qr = view
        .qr
        .map(|uri| {
            format!(
                "<aside class=\"qr\"><img src=\"{}\" alt=\"QR code for this view\">\
                 <p><a href=\"{}\">Open on your phone</a></p></aside>\n",
                uri,
                escape_html(view.current_url)
            )
        })
        .unwrap_or_default();

    if format == Format::Desktop {
        let _ = write!(body, "<div class=\"layout\"><main>{}</main>{}</div>", main, qr);
    } else {
        body.push_str(&main);
        body.push_str(&qr);
    }

    let _ = write!(
        body,
        "<footer><small>Updated {}</small></footer>",
        view.generated_at.format("%b %-d, %I:%M %p")
    );

    layout(BOARD_TITLE, format, &body, view.reload_script)
}

/// Standalone error page
pub fn error_page(code: u16, message: &str) -> String {
    let body = format!(
        "<h1>{code}</h1>\n<p>{message}</p>\n<p><a href=\"/\">Back to the board</a></p>",
        code = code,
        message = escape_html(message)
    );
    layout(&format!("{} - {}", code, message), Format::Desktop, &body, false)
}

fn format_nav(params: &DisplayParams) -> String {
    let mut nav = String::from("<nav>");
    for format in [Format::Desktop, Format::Mobile, Format::Kiosk, Format::Print] {
        if format == params.format {
            continue;
        }
        let mut switched = params.clone();
        switched.format = format;
        let _ = write!(
            nav,
            "<a href=\"/display?{}\">{}</a>",
            escape_html(&switched.to_query()),
            format.as_str()
        );
    }
    nav.push_str("</nav>\n");
    nav
}

fn render_item(item: &ScheduleItem, format: Format) -> String {
    let kind = if item.is_event() { "event" } else { "reservation" };
    let status = item.status_label();
    let status_class = status.to_lowercase().replace(' ', "-");

    let mut li = format!(
        "<li class=\"item item-{kind}\"><span class=\"time\">{time}</span> \
         <span class=\"title\">{title}</span>",
        kind = kind,
        time = escape_html(&item.time_range_label()),
        title = escape_html(&item.title),
    );

    if let Some(location) = &item.location {
        let _ = write!(li, " <span class=\"location\">@ {}</span>", escape_html(location));
    }

    let _ = write!(
        li,
        " <span class=\"badge status-{}\">{}</span>",
        escape_html(&status_class),
        escape_html(status)
    );

    if format != Format::Kiosk {
        if let ItemDetails::Event {
            capacity: Some(capacity),
            enrollment,
            ..
        } = &item.details
        {
            let _ = write!(
                li,
                " <span class=\"capacity\">{}/{} registered</span>",
                enrollment, capacity
            );
        }
    }

    let _ = write!(
        li,
        " <span class=\"source\">{}</span>",
        item.source.display_name()
    );

    li.push_str("</li>\n");
    li
}
