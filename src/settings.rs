use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use config::Config;
use serde::Deserialize;

use crate::pdf::TableSettings;

const CONFIG_FILE: &str = "schedule";
const ENV_PREFIX: &str = "SCHEDULE";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schedules_dir: PathBuf,
    pub database: PathBuf,
    pub term: TermSettings,
    pub google: GoogleSettings,
    pub table: TableSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schedules_dir: PathBuf::from("schedules"),
            database: PathBuf::from("database.csv"),
            term: TermSettings::default(),
            google: GoogleSettings::default(),
            table: TableSettings::default(),
        }
    }
}

/// The one-week template the weekly recurrences are anchored to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TermSettings {
    pub calendar_name: String,
    /// IANA name written into exported events.
    pub timezone: String,
    /// Fixed offset of `timezone` from UTC.
    pub utc_offset_minutes: i32,
    /// Any date in the first teaching week; aligned back to its Monday.
    pub week_start: NaiveDate,
    pub until: DateTime<Utc>,
    pub reminder_minutes: u32,
}

impl Default for TermSettings {
    fn default() -> Self {
        Self {
            calendar_name: "AITU Schedule - Trimester 3".to_string(),
            timezone: "Asia/Almaty".to_string(),
            utc_offset_minutes: 300,
            week_start: NaiveDate::from_ymd_opt(2026, 3, 9).unwrap_or_default(),
            until: Utc
                .with_ymd_and_hms(2026, 5, 17, 18, 0, 0)
                .single()
                .unwrap_or_default(),
            reminder_minutes: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GoogleSettings {
    pub credentials_file: PathBuf,
    /// Inline client config; wins over `credentials_file`.
    pub credentials_json: Option<String>,
    pub redirect_uri: String,
    pub pending_cache: PathBuf,
}

impl Default for GoogleSettings {
    fn default() -> Self {
        Self {
            credentials_file: PathBuf::from("credentials_web.json"),
            credentials_json: None,
            redirect_uri: "http://localhost:8501/".to_string(),
            pending_cache: PathBuf::from("oauth_events_cache.json"),
        }
    }
}

/// `schedule.{toml,json,yaml}` if present, then `SCHEDULE_*` variables
/// (`SCHEDULE_TERM__REMINDER_MINUTES=15`).
pub fn load() -> Result<Settings, config::ConfigError> {
    Config::builder()
        .add_source(config::File::with_name(CONFIG_FILE).required(false))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.database, PathBuf::from("database.csv"));
        assert_eq!(s.term.week_start.to_string(), "2026-03-09");
        assert_eq!(s.term.until.to_rfc3339(), "2026-05-17T18:00:00+00:00");
        assert_eq!(s.term.reminder_minutes, 10);
        assert_eq!(s.google.redirect_uri, "http://localhost:8501/");
        assert!(s.google.credentials_json.is_none());
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg = Config::builder()
            .add_source(config::File::from_str(
                "database = \"out/db.csv\"\n[term]\nreminder_minutes = 15\nweek_start = \"2026-09-07\"\n[table]\nsnap_tolerance = 1.5\n",
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let s: Settings = cfg.try_deserialize().unwrap();
        assert_eq!(s.database, PathBuf::from("out/db.csv"));
        assert_eq!(s.schedules_dir, PathBuf::from("schedules"));
        assert_eq!(s.term.reminder_minutes, 15);
        assert_eq!(s.term.week_start.to_string(), "2026-09-07");
        assert_eq!(s.term.timezone, "Asia/Almaty");
        assert_eq!(s.table.snap_tolerance, 1.5);
        assert_eq!(s.table.min_cols, 2);
    }
}
