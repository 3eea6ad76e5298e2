//! Kiosk auto-reload
//!
//! A page opened with `format=kiosk` in its query string reloads itself
//! every five minutes. The reload keeps the URL intact, so every fresh
//! page instance arms the timer again.
//!
//! The trigger decision is a pure function over the query string. Reading
//! the location, scheduling the deferred action and reloading the page are
//! injected through [`PageHost`] and [`Scheduler`], so the same logic backs
//! the terminal kiosk and the tests. The browser gets an equivalent
//! script generated from the same constants (see [`browser_script`]).

mod scheduler;
mod script;

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use scheduler::{Scheduler, TokioScheduler};
pub use script::browser_script;

/// Query fragment that opts a page into auto-reload
pub const KIOSK_TRIGGER: &str = "format=kiosk";

/// Query parameter name and value checked in [`MatchMode::Parameter`]
const KIOSK_PARAM: (&str, &str) = ("format", "kiosk");

/// Delay between page load and reload (5 minutes)
pub const RELOAD_DELAY: Duration = Duration::from_millis(300_000);

/// How the query string is tested for the kiosk trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Plain substring containment of `format=kiosk`.
    ///
    /// Also matches `format=kiosk123` and `xformat=kiosk`.
    #[default]
    Substring,
    /// Decoded key/value pairs, requiring exactly `format` = `kiosk`
    Parameter,
}

impl MatchMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchMode::Substring => "substring",
            MatchMode::Parameter => "parameter",
        }
    }
}

impl std::str::FromStr for MatchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "substring" => Ok(MatchMode::Substring),
            "parameter" | "exact" => Ok(MatchMode::Parameter),
            other => Err(format!("unknown kiosk match mode '{}'", other)),
        }
    }
}

/// Outcome of evaluating the trigger for one page load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadDecision {
    /// Not a kiosk page; nothing is scheduled
    Idle,
    /// Schedule one reload after `delay`
    Arm { delay: Duration },
}

impl ReloadDecision {
    pub fn is_armed(&self) -> bool {
        matches!(self, ReloadDecision::Arm { .. })
    }

    pub fn delay(&self) -> Option<Duration> {
        match self {
            ReloadDecision::Arm { delay } => Some(*delay),
            ReloadDecision::Idle => None,
        }
    }
}

/// Decide whether a page with this query string should arm the reload timer.
///
/// `query` is the search component of the URL, with or without the
/// leading `?`.
pub fn decide(query: &str, mode: MatchMode) -> ReloadDecision {
    let matched = match mode {
        MatchMode::Substring => query.contains(KIOSK_TRIGGER),
        MatchMode::Parameter => {
            let query = query.strip_prefix('?').unwrap_or(query);
            url::form_urlencoded::parse(query.as_bytes())
                .any(|(k, v)| k == KIOSK_PARAM.0 && v == KIOSK_PARAM.1)
        }
    };

    if matched {
        ReloadDecision::Arm {
            delay: RELOAD_DELAY,
        }
    } else {
        ReloadDecision::Idle
    }
}

/// The hosting page: where the current location is read and reloads go
pub trait PageHost: Send + Sync {
    /// Full current URL
    fn href(&self) -> String;

    /// Query component including the leading `?`, or empty
    fn search(&self) -> String;

    /// Reload the page at `href`. Fire-and-forget.
    fn reload(&self, href: &str);
}

/// Arms the reload timer for one page instance
pub struct AutoReloader<H, S> {
    host: Arc<H>,
    scheduler: S,
    mode: MatchMode,
}

impl<H, S> AutoReloader<H, S>
where
    H: PageHost + 'static,
    S: Scheduler,
{
    pub fn new(host: Arc<H>, scheduler: S) -> Self {
        Self {
            host,
            scheduler,
            mode: MatchMode::default(),
        }
    }

    /// Builder pattern: set match mode
    pub fn with_mode(mut self, mode: MatchMode) -> Self {
        self.mode = mode;
        self
    }

    /// Evaluate the trigger and, if it matches, schedule the reload.
    ///
    /// Each call schedules its own timer; calling twice on a kiosk URL arms
    /// two independent reloads. The returned handle is never cancelled here.
    pub fn init(&self) -> Option<S::Handle> {
        let search = self.host.search();
        let delay = self.decide_for(&search).delay()?;

        tracing::debug!(
            search = %search,
            delay_ms = delay.as_millis() as u64,
            "Kiosk mode detected, arming reload"
        );

        let host = Arc::clone(&self.host);
        Some(self.scheduler.schedule_once(
            delay,
            Box::new(move || {
                let href = host.href();
                tracing::info!("Kiosk reload: {}", href);
                host.reload(&href);
            }),
        ))
    }

    fn decide_for(&self, search: &str) -> ReloadDecision {
        decide(search, self.mode)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{ManualScheduler, RecordingHost};
    use super::*;

    #[test]
    fn test_decide_scenarios() {
        let armed = ReloadDecision::Arm {
            delay: Duration::from_millis(300_000),
        };
        assert_eq!(decide("?format=kiosk", MatchMode::Substring), armed);
        assert_eq!(decide("?format=kiosk&view=1", MatchMode::Substring), armed);
        assert_eq!(decide("?mode=kiosk", MatchMode::Substring), ReloadDecision::Idle);
        assert_eq!(decide("", MatchMode::Substring), ReloadDecision::Idle);
    }

    #[test]
    fn test_substring_mode_is_loose() {
        assert!(decide("?format=kiosk123", MatchMode::Substring).is_armed());
        assert!(decide("?xformat=kiosk", MatchMode::Substring).is_armed());
    }

    #[test]
    fn test_parameter_mode_is_exact() {
        assert!(decide("?format=kiosk", MatchMode::Parameter).is_armed());
        assert!(decide("range=today&format=kiosk", MatchMode::Parameter).is_armed());
        assert!(!decide("?format=kiosk123", MatchMode::Parameter).is_armed());
        assert!(!decide("?xformat=kiosk", MatchMode::Parameter).is_armed());
        assert!(!decide("", MatchMode::Parameter).is_armed());
    }

    #[test]
    fn test_match_mode_from_str() {
        assert_eq!("substring".parse::<MatchMode>(), Ok(MatchMode::Substring));
        assert_eq!("Parameter".parse::<MatchMode>(), Ok(MatchMode::Parameter));
        assert!("fuzzy".parse::<MatchMode>().is_err());
    }

    #[test]
    fn test_init_arms_once_and_reloads_same_url() {
        let href = "http://board.local/display?range=today&format=kiosk";
        let host = RecordingHost::new(href);
        let scheduler = ManualScheduler::default();

        let reloader = AutoReloader::new(Arc::clone(&host), &scheduler);
        assert!(reloader.init().is_some());
        assert_eq!(scheduler.delays(), vec![Duration::from_millis(300_000)]);
        assert!(host.reloads().is_empty());

        assert_eq!(scheduler.fire_all(), 1);
        assert_eq!(host.reloads(), vec![href.to_string()]);
    }

    #[test]
    fn test_init_without_trigger_schedules_nothing() {
        for href in ["http://board.local/display?mode=kiosk", "http://board.local/display"] {
            let host = RecordingHost::new(href);
            let scheduler = ManualScheduler::default();
            let reloader = AutoReloader::new(Arc::clone(&host), &scheduler);

            assert!(reloader.init().is_none());
            assert!(scheduler.delays().is_empty());
            assert_eq!(scheduler.fire_all(), 0);
            assert!(host.reloads().is_empty());
        }
    }

    #[test]
    fn test_double_init_arms_two_timers() {
        let href = "http://board.local/display?format=kiosk";
        let host = RecordingHost::new(href);
        let scheduler = ManualScheduler::default();
        let reloader = AutoReloader::new(Arc::clone(&host), &scheduler);

        reloader.init();
        reloader.init();
        assert_eq!(scheduler.delays().len(), 2);

        scheduler.fire_all();
        assert_eq!(host.reloads().len(), 2);
    }

    #[test]
    fn test_parameter_mode_reloader() {
        let host = RecordingHost::new("http://board.local/display?format=kiosk123");
        let scheduler = ManualScheduler::default();
        let reloader =
            AutoReloader::new(Arc::clone(&host), &scheduler).with_mode(MatchMode::Parameter);

        assert!(reloader.init().is_none());
    }
}
