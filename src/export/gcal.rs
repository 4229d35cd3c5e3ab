//! Google Calendar sync over the REST API: OAuth web flow, calendar lookup,
//! recurring event insertion.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::ics::describe;
use super::term::Term;
use crate::error::SyncError;
use crate::record::ClassRecord;
use crate::settings::GoogleSettings;

pub const CALENDAR_SCOPE: &str = "https://www.googleapis.com/auth/calendar";
const API_BASE: &str = "https://www.googleapis.com/calendar/v3/";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Predefined event colors are ids `"1"` to `"11"`.
const COLOR_COUNT: usize = 11;
const MAX_RETRIES: u32 = 3;
const BASE_BACKOFF_MS: u64 = 500;

// ── OAuth ──

/// OAuth client registration, as downloaded from the Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientFile {
    web: Option<ClientConfig>,
    installed: Option<ClientConfig>,
}

impl ClientConfig {
    /// Accepts either a `web` or an `installed` client section.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let file: ClientFile = serde_json::from_str(json)?;
        file.web
            .or(file.installed)
            .ok_or_else(|| SyncError::Credentials("no `web` or `installed` client section".into()))
    }

    /// Inline JSON from settings wins over the credentials file.
    pub fn load(settings: &GoogleSettings) -> Result<Self, SyncError> {
        if let Some(json) = &settings.credentials_json {
            return Self::from_json(json);
        }
        let json = std::fs::read_to_string(&settings.credentials_file).map_err(|e| {
            SyncError::Credentials(format!("{}: {}", settings.credentials_file.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url, SyncError> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", CALENDAR_SCOPE),
                ("state", state),
                ("access_type", "offline"),
                ("include_granted_scopes", "true"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| SyncError::Url(e.to_string()))
    }

    pub async fn exchange_code(
        &self,
        http: &Client,
        code: &str,
        redirect_uri: &str,
    ) -> Result<AccessToken, SyncError> {
        let resp = http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;
        let token: AccessToken = checked(resp).await?.json().await?;
        debug!("token exchanged, expires in {:?}s", token.expires_in);
        Ok(token)
    }
}

/// Opaque value echoed back by the redirect; keys the pending selection.
pub fn new_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

async fn checked(resp: reqwest::Response) -> Result<reqwest::Response, SyncError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(SyncError::Api {
        status: status.as_u16(),
        body,
    })
}

// ── Event payloads ──

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    pub location: String,
    pub description: String,
    pub color_id: String,
    pub start: EventTime,
    pub end: EventTime,
    pub recurrence: Vec<String>,
    pub reminders: Reminders,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTime {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    pub overrides: Vec<ReminderOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReminderOverride {
    pub method: String,
    pub minutes: u32,
}

/// Stable color per discipline: first-seen order, cycling through the
/// eleven predefined ids.
#[derive(Debug, Default)]
pub struct ColorPalette {
    assigned: HashMap<String, String>,
}

impl ColorPalette {
    pub fn color_for(&mut self, discipline: &str) -> String {
        let next = self.assigned.len() % COLOR_COUNT + 1;
        self.assigned
            .entry(discipline.to_string())
            .or_insert_with(|| next.to_string())
            .clone()
    }
}

/// Payloads for every record with a usable day and time span.
pub fn build_events<'a, I>(records: I, term: &Term) -> Vec<EventBody>
where
    I: IntoIterator<Item = &'a ClassRecord>,
{
    let mut palette = ColorPalette::default();
    let mut events = Vec::new();
    for record in records {
        let Some(occ) = term.occurrence(record) else {
            continue;
        };
        let (Some(start), Some(end)) = (term.local(occ.date, occ.start), term.local(occ.date, occ.end)) else {
            continue;
        };
        events.push(EventBody {
            summary: record.discipline.clone(),
            location: record.classroom.clone(),
            description: describe(record),
            color_id: palette.color_for(&record.discipline),
            start: EventTime {
                date_time: start.to_rfc3339(),
                time_zone: term.timezone.clone(),
            },
            end: EventTime {
                date_time: end.to_rfc3339(),
                time_zone: term.timezone.clone(),
            },
            recurrence: vec![term.rrule()],
            reminders: Reminders {
                use_default: false,
                overrides: vec![ReminderOverride {
                    method: "popup".to_string(),
                    minutes: term.reminder_minutes,
                }],
            },
        });
    }
    events
}

// ── API client ──

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalendarList {
    #[serde(default)]
    items: Vec<CalendarEntry>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CalendarEntry {
    id: String,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

pub struct GoogleCalendar {
    http: Client,
    token: String,
    base: Url,
}

impl GoogleCalendar {
    pub fn new(http: Client, token: &AccessToken) -> Result<Self, SyncError> {
        let base = Url::parse(API_BASE).map_err(|e| SyncError::Url(e.to_string()))?;
        Ok(Self {
            http,
            token: token.access_token.clone(),
            base,
        })
    }

    /// `segments` are percent-encoded; calendar ids contain `@` and `#`.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, SyncError> {
        endpoint(&self.base, segments)
    }

    /// Id of the calendar whose summary is `name`, creating it if absent.
    pub async fn find_or_create_calendar(&self, name: &str, timezone: &str) -> Result<String, SyncError> {
        let list_url = self.endpoint(&["users", "me", "calendarList"])?;
        let mut page_token: Option<String> = None;
        loop {
            let mut req = self.http.get(list_url.clone()).bearer_auth(&self.token);
            if let Some(t) = &page_token {
                req = req.query(&[("pageToken", t.as_str())]);
            }
            let page: CalendarList = checked(req.send().await?).await?.json().await?;
            if let Some(found) = page.items.into_iter().find(|c| c.summary == name) {
                info!("Using calendar '{}'", name);
                return Ok(found.id);
            }
            match page.next_page_token {
                Some(t) => page_token = Some(t),
                None => break,
            }
        }

        let resp = self
            .http
            .post(self.endpoint(&["calendars"])?)
            .bearer_auth(&self.token)
            .json(&serde_json::json!({ "summary": name, "timeZone": timezone }))
            .send()
            .await?;
        let created: Created = checked(resp).await?.json().await?;
        info!("Created calendar '{}'", name);
        Ok(created.id)
    }

    /// Insert one event, retrying on rate limits and server errors.
    pub async fn insert_event(&self, calendar_id: &str, event: &EventBody) -> Result<String, SyncError> {
        let url = self.endpoint(&["calendars", calendar_id, "events"])?;
        let mut attempt = 0;
        loop {
            let resp = self
                .http
                .post(url.clone())
                .bearer_auth(&self.token)
                .json(event)
                .send()
                .await?;
            let status = resp.status();
            if !is_retryable(status) || attempt == MAX_RETRIES {
                let created: Created = checked(resp).await?.json().await?;
                return Ok(created.id);
            }
            let backoff = Duration::from_millis(BASE_BACKOFF_MS * 2u64.pow(attempt));
            warn!(
                "{} inserting '{}' (attempt {}/{}), backing off {:.1}s",
                status,
                event.summary,
                attempt + 1,
                MAX_RETRIES,
                backoff.as_secs_f64()
            );
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Insert every event in order; stops at the first failure.
    pub async fn insert_all(&self, calendar_id: &str, events: &[EventBody]) -> Result<Vec<String>, SyncError> {
        let mut ids = Vec::with_capacity(events.len());
        for event in events {
            ids.push(self.insert_event(calendar_id, event).await?);
        }
        Ok(ids)
    }
}

fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, SyncError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| SyncError::Url(format!("{} cannot be a base", base)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::TermSettings;

    const WEB_CLIENT: &str = r#"{"web":{"client_id":"abc.apps.googleusercontent.com","client_secret":"s3cret","auth_uri":"https://accounts.google.com/o/oauth2/auth","token_uri":"https://oauth2.googleapis.com/token","redirect_uris":["http://localhost:8501/"]}}"#;

    fn class(day: &str, time: &str, discipline: &str) -> ClassRecord {
        ClassRecord {
            group: "SE-2501".to_string(),
            day: day.to_string(),
            time: time.to_string(),
            discipline: discipline.to_string(),
            classroom: "C1.1.237".to_string(),
            kind: "Lecture".to_string(),
            lecturer: "Dr. Kim".to_string(),
            program: None,
        }
    }

    #[test]
    fn client_config_sections() {
        let web = ClientConfig::from_json(WEB_CLIENT).unwrap();
        assert_eq!(web.client_id, "abc.apps.googleusercontent.com");

        let installed = ClientConfig::from_json(r#"{"installed":{"client_id":"i","client_secret":"x"}}"#).unwrap();
        assert_eq!(installed.token_uri, DEFAULT_TOKEN_URI);

        assert!(matches!(
            ClientConfig::from_json(r#"{"other":{}}"#),
            Err(SyncError::Credentials(_))
        ));
        assert!(matches!(ClientConfig::from_json("not json"), Err(SyncError::Config(_))));
    }

    #[test]
    fn inline_credentials_win() {
        let settings = GoogleSettings {
            credentials_file: "missing.json".into(),
            credentials_json: Some(WEB_CLIENT.to_string()),
            ..Default::default()
        };
        assert!(ClientConfig::load(&settings).is_ok());

        let settings = GoogleSettings {
            credentials_file: "missing.json".into(),
            ..Default::default()
        };
        assert!(matches!(ClientConfig::load(&settings), Err(SyncError::Credentials(_))));
    }

    #[test]
    fn authorization_url_params() {
        let client = ClientConfig::from_json(WEB_CLIENT).unwrap();
        let url = client.authorization_url("http://localhost:8501/", "st4te").unwrap();
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        assert_eq!(url.host_str(), Some("accounts.google.com"));
        assert_eq!(params["scope"], CALENDAR_SCOPE);
        assert_eq!(params["redirect_uri"], "http://localhost:8501/");
        assert_eq!(params["state"], "st4te");
        assert_eq!(params["access_type"], "offline");
        assert_eq!(params["prompt"], "consent");
        assert_eq!(params["include_granted_scopes"], "true");
        assert_eq!(params["response_type"], "code");
    }

    #[test]
    fn states_are_unique() {
        assert_ne!(new_state(), new_state());
        assert_eq!(new_state().len(), 32);
    }

    #[test]
    fn palette_cycles_in_first_seen_order() {
        let mut palette = ColorPalette::default();
        let ids: Vec<String> = (0..12).map(|i| palette.color_for(&format!("d{}", i))).collect();
        assert_eq!(ids[0], "1");
        assert_eq!(ids[10], "11");
        assert_eq!(ids[11], "1");
        assert_eq!(palette.color_for("d3"), "4");
    }

    #[test]
    fn events_from_records() {
        let term = Term::new(&TermSettings::default());
        let records = vec![
            class("Monday", "09:00-09:50", "Calculus"),
            class("Funday", "09:00-09:50", "Skipped"),
            class("Thursday", "14:00-14:50", "English"),
            class("Friday", "09:00-09:50", "Calculus"),
        ];
        let events = build_events(&records, &term);
        assert_eq!(events.len(), 3);

        let first = &events[0];
        assert_eq!(first.start.date_time, "2026-03-09T09:00:00+05:00");
        assert_eq!(first.end.date_time, "2026-03-09T09:50:00+05:00");
        assert_eq!(first.start.time_zone, "Asia/Almaty");
        assert_eq!(first.recurrence, vec!["RRULE:FREQ=WEEKLY;UNTIL=20260517T180000Z".to_string()]);
        assert_eq!(first.description, "Group: SE-2501\nType: Lecture\nLecturer: Dr. Kim");

        let colors: Vec<&str> = events.iter().map(|e| e.color_id.as_str()).collect();
        assert_eq!(colors, vec!["1", "2", "1"]);
    }

    #[test]
    fn event_json_shape() {
        let term = Term::new(&TermSettings::default());
        let events = build_events(&[class("Monday", "09:00-09:50", "Calculus")], &term);
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["colorId"], "1");
        assert_eq!(json["start"]["dateTime"], "2026-03-09T09:00:00+05:00");
        assert_eq!(json["reminders"]["useDefault"], false);
        assert_eq!(json["reminders"]["overrides"][0]["method"], "popup");
        assert_eq!(json["reminders"]["overrides"][0]["minutes"], 10);
    }

    #[test]
    fn calendar_ids_are_escaped() {
        let base = Url::parse(API_BASE).unwrap();
        let url = endpoint(&base, &["calendars", "abc#x@group.calendar.google.com", "events"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://www.googleapis.com/calendar/v3/calendars/abc%23x@group.calendar.google.com/events"
        );
    }

    #[test]
    fn retry_policy() {
        assert!(is_retryable(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable(StatusCode::BAD_GATEWAY));
        assert!(!is_retryable(StatusCode::UNAUTHORIZED));
    }
}
