//! Settings management
//!
//! Defaults, overlaid by an optional TOML file, overlaid by environment
//! variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::kiosk::MatchMode;
use crate::render::{QrOptions, MAX_BORDER, MAX_MODULE_SIZE};

const DEFAULT_WILD_APRICOT_URL: &str = "https://wautils.nova-labs.org/api/digital_sign/events";
const DEFAULT_SKEDDA_ICAL_URL: &str =
    "https://novalabs.skedda.com/ical?k=6uXn10Wdzz_QolZkWb4IduCRE8QKY2M1&i=774516";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Wild Apricot events JSON endpoint
    pub wild_apricot_url: String,

    /// Skedda iCal export URL
    pub skedda_ical_url: String,

    /// Per-feed fetch timeout in seconds
    pub fetch_timeout_secs: u64,

    /// Hide items dated before today unless the query says otherwise
    pub filter_past_events: bool,

    /// Address the HTTP server binds to
    pub bind: String,

    /// Public base URL for links and QR codes; derived from the request when unset
    pub public_base_url: Option<String>,

    /// Default log filter when RUST_LOG is unset
    pub log_level: String,

    /// Kiosk trigger matching
    pub kiosk_match: MatchMode,

    pub qr: QrOptions,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            wild_apricot_url: DEFAULT_WILD_APRICOT_URL.to_string(),
            skedda_ical_url: DEFAULT_SKEDDA_ICAL_URL.to_string(),
            fetch_timeout_secs: 10,
            filter_past_events: true,
            bind: "0.0.0.0:8000".to_string(),
            public_base_url: None,
            log_level: "info".to_string(),
            kiosk_match: MatchMode::Substring,
            qr: QrOptions::default(),
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("signboard").join("config.toml"))
    }

    /// Load settings: explicit file (must exist), else the default file if
    /// present, then environment overrides
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        let mut settings = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings: Settings = toml::from_str(&content).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Apply overrides from a variable lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("WILD_APRICOT_URL") {
            self.wild_apricot_url = url;
        }
        if let Some(url) = lookup("SKEDDA_ICAL_URL") {
            self.skedda_ical_url = url;
        }
        if let Some(raw) = lookup("FETCH_TIMEOUT") {
            self.fetch_timeout_secs = raw.trim().parse().map_err(|_| SettingsError::InvalidValue {
                key: "FETCH_TIMEOUT",
                message: format!("expected whole seconds, got '{}'", raw),
            })?;
        }
        if let Some(raw) = lookup("FILTER_PAST_EVENTS") {
            self.filter_past_events = raw.trim().eq_ignore_ascii_case("true");
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.log_level = level.to_lowercase();
        }
        if let Some(bind) = lookup("SIGNBOARD_BIND") {
            self.bind = bind;
        }
        if let Some(base) = lookup("SIGNBOARD_BASE_URL") {
            let base = base.trim().trim_end_matches('/').to_string();
            self.public_base_url = if base.is_empty() { None } else { Some(base) };
        }
        if let Some(raw) = lookup("KIOSK_MATCH") {
            self.kiosk_match = raw
                .parse()
                .map_err(|message| SettingsError::InvalidValue {
                    key: "KIOSK_MATCH",
                    message,
                })?;
        }
        Ok(())
    }

    /// Reject values that cannot be rendered
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.qr.module_size > MAX_MODULE_SIZE {
            return Err(SettingsError::InvalidValue {
                key: "qr.module_size",
                message: format!("{} exceeds the {} px limit", self.qr.module_size, MAX_MODULE_SIZE),
            });
        }
        if self.qr.border > MAX_BORDER {
            return Err(SettingsError::InvalidValue {
                key: "qr.border",
                message: format!("{} exceeds the {} module limit", self.qr.border, MAX_BORDER),
            });
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.fetch_timeout(), Duration::from_secs(10));
        assert!(settings.filter_past_events);
        assert_eq!(settings.kiosk_match, MatchMode::Substring);
        assert_eq!(settings.qr.module_size, 10);
        assert_eq!(settings.qr.border, 4);
    }

    #[test]
    fn test_env_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(lookup(&[
                ("FETCH_TIMEOUT", "25"),
                ("FILTER_PAST_EVENTS", "False"),
                ("SIGNBOARD_BASE_URL", "https://sign.example.org/"),
                ("KIOSK_MATCH", "parameter"),
                ("LOG_LEVEL", "DEBUG"),
            ]))
            .unwrap();

        assert_eq!(settings.fetch_timeout_secs, 25);
        assert!(!settings.filter_past_events);
        assert_eq!(settings.public_base_url.as_deref(), Some("https://sign.example.org"));
        assert_eq!(settings.kiosk_match, MatchMode::Parameter);
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn test_invalid_env_value() {
        let mut settings = Settings::default();
        let err = settings
            .apply_overrides(lookup(&[("FETCH_TIMEOUT", "ten")]))
            .unwrap_err();
        assert!(err.to_string().contains("FETCH_TIMEOUT"));

        let err = settings
            .apply_overrides(lookup(&[("KIOSK_MATCH", "fuzzy")]))
            .unwrap_err();
        assert!(err.to_string().contains("KIOSK_MATCH"));
    }

    #[test]
    fn test_from_file_partial() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
bind = "127.0.0.1:9000"
kiosk_match = "parameter"

[qr]
error_correction = "H"
module_size = 6
"#
        )
        .unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.bind, "127.0.0.1:9000");
        assert_eq!(settings.kiosk_match, MatchMode::Parameter);
        assert_eq!(settings.qr.module_size, 6);
        assert_eq!(settings.qr.border, 4);
        assert_eq!(settings.wild_apricot_url, DEFAULT_WILD_APRICOT_URL);
    }

    #[test]
    fn test_oversized_qr_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[qr]\nmodule_size = 400000000").unwrap();
        let err = Settings::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { key: "qr.module_size", .. }));

        let settings = Settings {
            qr: QrOptions {
                border: MAX_BORDER + 1,
                ..QrOptions::default()
            },
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue { key: "qr.border", .. })
        ));
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_from_file_errors() {
        let missing = Settings::from_file(Path::new("/nonexistent/signboard.toml"));
        assert!(matches!(missing, Err(SettingsError::Read { .. })));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "fetch_timeout_secs = \"soon\"").unwrap();
        assert!(matches!(
            Settings::from_file(file.path()),
            Err(SettingsError::Parse { .. })
        ));
    }
}
