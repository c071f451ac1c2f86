use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use recap_core::{
    BusySlot, CalendarEvent, CalendarInfo, CalendarSource, NewCalendarEvent, RecapError, Result,
    SourceKind, TimeWindow,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{info, warn};

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/calendar/v3";
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Refresh this long before the stored expiry to avoid racing it.
const EXPIRY_SKEW_SECS: i64 = 60;

/// OAuth client settings plus the path of the persisted token file.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_path: PathBuf,
}

/// The locally persisted outcome of the offline-consent flow.
///
/// Written by the one-time consent setup and rewritten here on every
/// refresh.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredToken {
    pub access_token: String,
    pub refresh_token: String,
    pub expiry: DateTime<Utc>,
}

impl StoredToken {
    fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expiry - now < Duration::seconds(EXPIRY_SKEW_SECS)
    }
}

pub fn load_token(path: &Path) -> Result<StoredToken> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        RecapError::unavailable(SourceKind::Calendar, format!("token store: {}", e))
    })?;
    serde_json::from_str(&raw).map_err(|e| {
        RecapError::unavailable(SourceKind::Calendar, format!("token store: {}", e))
    })
}

pub fn persist_token(path: &Path, token: &StoredToken) -> Result<()> {
    let raw = serde_json::to_string_pretty(token).map_err(|e| {
        RecapError::unavailable(SourceKind::Calendar, format!("token store: {}", e))
    })?;
    std::fs::write(path, raw).map_err(|e| {
        RecapError::unavailable(SourceKind::Calendar, format!("token store: {}", e))
    })
}

/// Reject anything that is not an ISO-8601 datetime before it reaches the
/// platform.
fn validate_datetime(value: &str) -> Result<()> {
    DateTime::parse_from_rfc3339(value).map(|_| ()).map_err(|_| {
        RecapError::Validation(format!("invalid datetime '{}', expected ISO 8601", value))
    })
}

#[derive(Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: i64,
    refresh_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireTime {
    date_time: Option<String>,
    date: Option<String>,
}

impl WireTime {
    fn display(&self) -> String {
        self.date_time
            .clone()
            .or_else(|| self.date.clone())
            .unwrap_or_default()
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireAttendee {
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireOrganizer {
    email: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireEvent {
    id: String,
    summary: Option<String>,
    description: Option<String>,
    location: Option<String>,
    start: WireTime,
    end: WireTime,
    #[serde(default)]
    attendees: Vec<WireAttendee>,
    organizer: Option<WireOrganizer>,
    html_link: Option<String>,
}

#[derive(Deserialize)]
struct WireEvents {
    #[serde(default)]
    items: Vec<WireEvent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WireCalendar {
    id: String,
    summary: String,
    description: Option<String>,
    #[serde(default)]
    primary: bool,
    access_role: Option<String>,
}

#[derive(Deserialize)]
struct WireCalendars {
    #[serde(default)]
    items: Vec<WireCalendar>,
}

#[derive(Deserialize)]
struct WireBusyCalendar {
    #[serde(default)]
    busy: Vec<BusySlot>,
}

#[derive(Deserialize)]
struct WireFreeBusy {
    #[serde(default)]
    calendars: HashMap<String, WireBusyCalendar>,
}

fn to_event(wire: WireEvent) -> CalendarEvent {
    CalendarEvent {
        id: wire.id,
        summary: wire.summary.unwrap_or_else(|| "No Title".to_string()),
        description: wire.description,
        start: wire.start.display(),
        end: wire.end.display(),
        location: wire.location,
        attendees: wire.attendees.into_iter().filter_map(|a| a.email).collect(),
        organizer: wire.organizer.and_then(|o| o.email),
        url: wire.html_link,
    }
}

/// Google Calendar client with offline-consent token persistence.
pub struct GoogleCalendarClient {
    http: reqwest::Client,
    config: Option<GoogleConfig>,
    /// In-memory token cache; guarded so only one request refreshes.
    token: Mutex<Option<StoredToken>>,
    api_base: String,
    token_url: String,
}

impl GoogleCalendarClient {
    pub fn new(config: Option<GoogleConfig>) -> Self {
        Self::with_endpoints(config, DEFAULT_API_BASE, DEFAULT_TOKEN_URL)
    }

    pub fn with_endpoints(
        config: Option<GoogleConfig>,
        api_base: impl Into<String>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            http: crate::http_client(),
            config,
            token: Mutex::new(None),
            api_base: api_base.into(),
            token_url: token_url.into(),
        }
    }

    async fn refresh(&self, cfg: &GoogleConfig, refresh_token: &str) -> Result<StoredToken> {
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("client_id", cfg.client_id.as_str()),
                ("client_secret", cfg.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Calendar,
                status.as_u16(),
                message,
            ));
        }

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;

        info!("calendar access token refreshed");
        Ok(StoredToken {
            access_token: body.access_token,
            refresh_token: body
                .refresh_token
                .unwrap_or_else(|| refresh_token.to_string()),
            expiry: Utc::now() + Duration::seconds(body.expires_in),
        })
    }

    /// Current access token, refreshing and re-persisting when close to
    /// expiry.
    async fn access_token(&self) -> Result<String> {
        let cfg = self
            .config
            .as_ref()
            .ok_or(RecapError::unconfigured(SourceKind::Calendar))?;

        let mut guard = self.token.lock().await;
        let token = match guard.take() {
            Some(token) => token,
            None => load_token(&cfg.token_path)?,
        };

        let token = if token.needs_refresh(Utc::now()) {
            let refreshed = self.refresh(cfg, &token.refresh_token).await?;
            persist_token(&cfg.token_path, &refreshed)?;
            refreshed
        } else {
            token
        };

        let access = token.access_token.clone();
        *guard = Some(token);
        Ok(access)
    }

    async fn get_json<T: DeserializeOwned>(&self, token: &str, url: String) -> Result<T> {
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Calendar,
                status.as_u16(),
                message,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))
    }
}

#[async_trait]
impl CalendarSource for GoogleCalendarClient {
    fn configured(&self) -> bool {
        self.config.is_some()
    }

    async fn events(&self, window: TimeWindow, calendar_id: &str) -> Result<Vec<CalendarEvent>> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!("calendar credentials unavailable, returning no events: {}", err);
                return Ok(Vec::new());
            }
        };

        let (time_min, time_max) = window.split();
        let url = format!(
            "{}/calendars/{}/events?timeMin={}&timeMax={}&singleEvents=true&orderBy=startTime",
            self.api_base,
            urlencoding::encode(calendar_id),
            urlencoding::encode(&time_min.to_rfc3339()),
            urlencoding::encode(&time_max.to_rfc3339()),
        );

        let body: WireEvents = self.get_json(&token, url).await?;
        Ok(body.items.into_iter().map(to_event).collect())
    }

    async fn calendars(&self) -> Result<Vec<CalendarInfo>> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!("calendar credentials unavailable, returning no calendars: {}", err);
                return Ok(Vec::new());
            }
        };

        let body: WireCalendars = self
            .get_json(&token, format!("{}/users/me/calendarList", self.api_base))
            .await?;

        Ok(body
            .items
            .into_iter()
            .map(|c| CalendarInfo {
                id: c.id,
                summary: c.summary,
                description: c.description,
                primary: c.primary,
                access_role: c.access_role,
            })
            .collect())
    }

    async fn busy_times(&self, window: TimeWindow, calendar_id: &str) -> Result<Vec<BusySlot>> {
        let token = match self.access_token().await {
            Ok(token) => token,
            Err(err) => {
                warn!("calendar credentials unavailable, returning no busy times: {}", err);
                return Ok(Vec::new());
            }
        };

        let now = Utc::now();
        let response = self
            .http
            .post(format!("{}/freeBusy", self.api_base))
            .bearer_auth(&token)
            .json(&json!({
                "timeMin": now.to_rfc3339(),
                "timeMax": window.until().to_rfc3339(),
                "items": [{"id": calendar_id}],
            }))
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Calendar,
                status.as_u16(),
                message,
            ));
        }

        let mut body: WireFreeBusy = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;

        Ok(body
            .calendars
            .remove(calendar_id)
            .map(|c| c.busy)
            .unwrap_or_default())
    }

    async fn create_event(&self, event: NewCalendarEvent) -> Result<CalendarEvent> {
        validate_datetime(&event.start_time)?;
        validate_datetime(&event.end_time)?;

        let token = self.access_token().await?;

        let mut payload = json!({
            "summary": event.summary,
            "description": event.description,
            "start": {"dateTime": event.start_time, "timeZone": "UTC"},
            "end": {"dateTime": event.end_time, "timeZone": "UTC"},
        });
        if !event.attendees.is_empty() {
            payload["attendees"] = serde_json::Value::Array(
                event
                    .attendees
                    .iter()
                    .map(|email| json!({"email": email}))
                    .collect(),
            );
        }

        let response = self
            .http
            .post(format!(
                "{}/calendars/{}/events",
                self.api_base,
                urlencoding::encode(&event.calendar_id)
            ))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(RecapError::api(
                SourceKind::Calendar,
                status.as_u16(),
                message,
            ));
        }

        let created: WireEvent = response
            .json()
            .await
            .map_err(|e| RecapError::unavailable(SourceKind::Calendar, e.to_string()))?;
        Ok(to_event(created))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn token(expiry: DateTime<Utc>) -> StoredToken {
        StoredToken {
            access_token: "ya29.access".into(),
            refresh_token: "1//refresh".into(),
            expiry,
        }
    }

    #[test]
    fn token_survives_persist_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tokens.json");

        let original = token(Utc::now() + Duration::hours(1));
        persist_token(&path, &original).unwrap();
        let loaded = load_token(&path).unwrap();
        assert_eq!(loaded, original);
    }

    #[test]
    fn missing_token_file_is_an_error() {
        let dir = tempdir().unwrap();
        let result = load_token(&dir.path().join("absent.json"));
        assert!(matches!(
            result,
            Err(RecapError::SourceUnavailable {
                source: SourceKind::Calendar,
                ..
            })
        ));
    }

    #[test]
    fn refresh_triggers_inside_the_skew_window() {
        let now = Utc::now();
        assert!(token(now + Duration::seconds(30)).needs_refresh(now));
        assert!(token(now - Duration::seconds(10)).needs_refresh(now));
        assert!(!token(now + Duration::seconds(120)).needs_refresh(now));
    }

    #[test]
    fn datetime_validation() {
        assert!(validate_datetime("2026-08-05T10:00:00Z").is_ok());
        assert!(validate_datetime("2026-08-05T10:00:00+02:00").is_ok());
        assert!(matches!(
            validate_datetime("next tuesday"),
            Err(RecapError::Validation(_))
        ));
        assert!(matches!(
            validate_datetime("2026-08-05"),
            Err(RecapError::Validation(_))
        ));
    }

    #[test]
    fn all_day_events_fall_back_to_date() {
        let wire: WireEvent = serde_json::from_value(serde_json::json!({
            "id": "ev1",
            "start": {"date": "2026-08-05"},
            "end": {"date": "2026-08-06"},
        }))
        .unwrap();

        let event = to_event(wire);
        assert_eq!(event.summary, "No Title");
        assert_eq!(event.start, "2026-08-05");
    }

    #[test]
    fn attendee_emails_are_flattened() {
        let wire: WireEvent = serde_json::from_value(serde_json::json!({
            "id": "ev2",
            "summary": "Planning",
            "start": {"dateTime": "2026-08-05T10:00:00Z"},
            "end": {"dateTime": "2026-08-05T11:00:00Z"},
            "attendees": [{"email": "a@acme.com"}, {}, {"email": "b@acme.com"}],
            "organizer": {"email": "lead@acme.com"}
        }))
        .unwrap();

        let event = to_event(wire);
        assert_eq!(event.attendees, vec!["a@acme.com", "b@acme.com"]);
        assert_eq!(event.organizer.as_deref(), Some("lead@acme.com"));
    }

    #[tokio::test]
    async fn unconfigured_reads_degrade_to_empty() {
        let client = GoogleCalendarClient::new(None);
        let window = TimeWindow::new(7).unwrap();

        assert!(client.events(window, "primary").await.unwrap().is_empty());
        assert!(client.calendars().await.unwrap().is_empty());
        assert!(client.busy_times(window, "primary").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_event_validates_before_any_call() {
        let client = GoogleCalendarClient::new(None);
        let result = client
            .create_event(NewCalendarEvent {
                summary: "Retro".into(),
                description: String::new(),
                start_time: "not a date".into(),
                end_time: "2026-08-05T11:00:00Z".into(),
                calendar_id: "primary".into(),
                attendees: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(RecapError::Validation(_))));
    }
}
