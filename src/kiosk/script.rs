//! Browser-side rendition of the kiosk reloader

use super::{MatchMode, KIOSK_PARAM, KIOSK_TRIGGER, RELOAD_DELAY};

/// JavaScript served to browsers at `/static/js/main.js`.
///
/// Runs once on load, arms a single `setTimeout` when the trigger matches
/// and reloads the current location when it fires.
pub fn browser_script(mode: MatchMode) -> String {
    let condition = match mode {
        MatchMode::Substring => {
            format!("window.location.search.includes('{}')", KIOSK_TRIGGER)
        }
        MatchMode::Parameter => format!(
            "new URLSearchParams(window.location.search).get('{}') === '{}'",
            KIOSK_PARAM.0, KIOSK_PARAM.1
        ),
    };

    format!(
        "// Auto-refresh for kiosk mode\n\
         (function() {{\n\
         \x20   if ({condition}) {{\n\
         \x20       setTimeout(function() {{\n\
         \x20           window.location.reload();\n\
         \x20       }}, {delay}); // {minutes} minutes\n\
         \x20   }}\n\
         }})();\n",
        condition = condition,
        delay = RELOAD_DELAY.as_millis(),
        minutes = RELOAD_DELAY.as_secs() / 60,
    )
}
