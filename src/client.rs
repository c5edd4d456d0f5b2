use std::time::Duration;

use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, ORIGIN, REFERER};
use serde_json::Value;
use tracing::{debug, trace};

use crate::auth::Authenticator;
use crate::logger::{MessageLogMode, MessageLogger};
use crate::profiles::ProfileStore;
use crate::schedule::{Slot, ValidationError, day_payload, decode_day, encode_day, week_payload};
use crate::types::{Day, DaySchedule, ScheduleEntry, Session};
use crate::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://beekeeper.hivehome.com/1.0";

type ScheduleCallback = Box<dyn Fn(&str, &[DaySchedule]) + Send + Sync>;

/// One "set day schedule" invocation: the target node and day, and either a
/// named profile or an explicit entry list. When both are supplied the
/// explicit entries win.
#[derive(Debug, Clone)]
pub struct SetDayScheduleRequest {
    pub node_id: String,
    pub day: Day,
    pub profile: Option<String>,
    pub entries: Option<Vec<ScheduleEntry>>,
}

impl SetDayScheduleRequest {
    pub fn with_entries(node_id: impl Into<String>, day: Day, entries: Vec<ScheduleEntry>) -> Self {
        Self {
            node_id: node_id.into(),
            day,
            profile: None,
            entries: Some(entries),
        }
    }

    pub fn with_profile(node_id: impl Into<String>, day: Day, profile: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            day,
            profile: Some(profile.into()),
            entries: None,
        }
    }

    fn resolve<'a>(&'a self, profiles: &'a ProfileStore) -> Result<&'a [ScheduleEntry]> {
        if let Some(entries) = &self.entries {
            return Ok(entries);
        }
        match &self.profile {
            Some(name) => profiles
                .get(name)
                .ok_or_else(|| ValidationError::UnknownProfile(name.clone()).into()),
            None => Err(ValidationError::MissingScheduleSource.into()),
        }
    }
}

pub struct HiveClientBuilder {
    auth: Authenticator,
    api_url: String,
    timeout: Duration,
    profiles: ProfileStore,
    schedule_callbacks: Vec<ScheduleCallback>,
    log_mode: Option<MessageLogMode>,
    log_path: Option<String>,
}

impl HiveClientBuilder {
    pub fn new(auth: Authenticator) -> Self {
        Self {
            auth,
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(30),
            profiles: ProfileStore::default(),
            schedule_callbacks: Vec::new(),
            log_mode: None,
            log_path: None,
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn profiles(mut self, profiles: ProfileStore) -> Self {
        self.profiles = profiles;
        self
    }

    /// Called with the node id and decoded week whenever a read succeeds.
    pub fn on_schedule(mut self, f: impl Fn(&str, &[DaySchedule]) + Send + Sync + 'static) -> Self {
        self.schedule_callbacks.push(Box::new(f));
        self
    }

    pub fn message_log(mut self, mode: MessageLogMode, path: impl Into<String>) -> Self {
        self.log_mode = Some(mode);
        self.log_path = Some(path.into());
        self
    }

    pub fn build(self) -> HiveClient {
        // The vendor API 403s requests that don't look like its web app.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ORIGIN, HeaderValue::from_static("https://my.hivehome.com"));
        headers.insert(REFERER, HeaderValue::from_static("https://my.hivehome.com/"));

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .default_headers(headers)
            .build()
            .expect("failed to build HTTP client");

        let logger = match (self.log_mode, self.log_path) {
            (Some(mode), Some(path)) => {
                Some(MessageLogger::new(mode, &path).expect("failed to open log file"))
            }
            _ => None,
        };

        HiveClient {
            http,
            api_url: self.api_url,
            auth: self.auth,
            profiles: self.profiles,
            schedule_callbacks: self.schedule_callbacks,
            logger,
        }
    }
}

/// Client for the vendor's per-node heating endpoint. One operation in
/// flight at a time; the host serializes calls per config entry.
pub struct HiveClient {
    http: reqwest::Client,
    api_url: String,
    auth: Authenticator,
    profiles: ProfileStore,
    schedule_callbacks: Vec<ScheduleCallback>,
    logger: Option<MessageLogger>,
}

impl HiveClient {
    pub fn builder(auth: Authenticator) -> HiveClientBuilder {
        HiveClientBuilder::new(auth)
    }

    pub fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    /// Replace one day of the node's heating schedule.
    ///
    /// Validates before any network traffic, POSTs the single-day payload
    /// with bearer auth, and on a 401 refreshes the session exactly once and
    /// retries exactly once. Returns the vendor's echo of the updated day.
    pub async fn set_day_schedule(
        &mut self,
        session: &mut Session,
        request: &SetDayScheduleRequest,
    ) -> Result<DaySchedule> {
        let entries = request.resolve(&self.profiles)?;
        let slots = encode_day(entries)?;
        let payload = day_payload(request.day, &slots);
        let path = format!("/nodes/heating/{}", request.node_id);
        debug!(
            node_id = %request.node_id,
            day = %request.day,
            entries = slots.len(),
            "updating day schedule"
        );

        let body = self.send_schedule(session, &path, &payload).await?;
        extract_day(&body, request.day)
    }

    /// Replace several days in one request. Every day is validated before
    /// any traffic; listing a day twice is rejected rather than last-wins.
    /// Days not listed keep their current schedule.
    pub async fn set_week_schedule(
        &mut self,
        session: &mut Session,
        node_id: &str,
        days: &[DaySchedule],
    ) -> Result<Vec<DaySchedule>> {
        if days.is_empty() {
            return Err(ValidationError::EmptySchedule.into());
        }
        let mut encoded: Vec<(Day, Vec<Slot>)> = Vec::with_capacity(days.len());
        for schedule in days {
            if encoded.iter().any(|(day, _)| *day == schedule.day) {
                return Err(ValidationError::DuplicateDay(schedule.day).into());
            }
            encoded.push((schedule.day, encode_day(&schedule.entries)?));
        }
        let payload = week_payload(&encoded);
        let path = format!("/nodes/heating/{node_id}");
        debug!(node_id, days = encoded.len(), "updating week schedule");

        let body = self.send_schedule(session, &path, &payload).await?;
        encoded
            .iter()
            .map(|(day, _)| extract_day(&body, *day))
            .collect()
    }

    /// Fetch the node's current weekly schedule. Best effort: the vendor
    /// rejects this read for callers other than its own first-party apps
    /// with a 403, which is surfaced as [`Error::Http`] rather than worked
    /// around. On success the decoded week is handed to every `on_schedule`
    /// callback and returned.
    pub async fn get_current_schedule(
        &mut self,
        session: &Session,
        node_id: &str,
    ) -> Result<Vec<DaySchedule>> {
        let path = format!("/nodes/heating/{node_id}");
        debug!(node_id, "fetching current schedule");
        if let Some(ref mut logger) = self.logger {
            logger.log_request("GET", &path, None);
        }

        let url = format!("{}{}", self.api_url, path);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&session.tokens().id_token)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        if let Some(ref mut logger) = self.logger {
            logger.log_response(status, &body);
        }
        if !(200..300).contains(&status) {
            return Err(http_error(status, &body));
        }

        let days = parse_week(&body)?;
        trace!(days = days.len(), "decoded schedule");
        for cb in &self.schedule_callbacks {
            cb(node_id, &days);
        }
        Ok(days)
    }

    /// Mint new tokens from the session's refresh token and swap them in.
    pub async fn refresh_session(&mut self, session: &mut Session) -> Result<()> {
        let tokens = self.auth.refresh(&session.tokens().refresh_token).await?;
        if let Some(ref mut logger) = self.logger {
            logger.log_auth("refresh", tokens.id_token.len());
        }
        session.replace(tokens);
        Ok(())
    }

    /// POST a schedule payload, refreshing and retrying exactly once on a
    /// 401. Any failure after that is surfaced, not retried again.
    async fn send_schedule(
        &mut self,
        session: &mut Session,
        path: &str,
        payload: &Value,
    ) -> Result<String> {
        if let Some(ref mut logger) = self.logger {
            logger.log_request("POST", path, Some(payload));
        }

        let url = format!("{}{}", self.api_url, path);
        let mut response = self.post_schedule(&url, session, payload).await?;

        if response.status().as_u16() == 401 {
            debug!("schedule update rejected with 401, refreshing session");
            self.refresh_session(session).await?;
            if let Some(ref mut logger) = self.logger {
                logger.log_request("POST", path, Some(payload));
            }
            response = self.post_schedule(&url, session, payload).await?;
        }

        let status = response.status().as_u16();
        let body = response.text().await?;
        if let Some(ref mut logger) = self.logger {
            logger.log_response(status, &body);
        }
        if !(200..300).contains(&status) {
            return Err(http_error(status, &body));
        }
        Ok(body)
    }

    async fn post_schedule(
        &self,
        url: &str,
        session: &Session,
        payload: &Value,
    ) -> Result<reqwest::Response> {
        Ok(self
            .http
            .post(url)
            .bearer_auth(&session.tokens().id_token)
            .header("Content-Type", "application/json")
            .body(payload.to_string())
            .send()
            .await?)
    }
}

/// Pull the vendor's error message out of a non-2xx body, falling back to
/// the raw text.
fn http_error(status: u16, body: &str) -> Error {
    let message = serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message", "reason"]
                .into_iter()
                .find_map(|key| v.get(key).and_then(|m| m.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string());
    Error::Http { status, message }
}

fn extract_day(body: &str, day: Day) -> Result<DaySchedule> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("schedule response: {e}")))?;
    let slots = parsed
        .pointer(&format!("/schedule/{}", day.as_api_str()))
        .ok_or_else(|| Error::Protocol(format!("response missing schedule for {day}")))?;
    let slots: Vec<Slot> = serde_json::from_value(slots.clone())
        .map_err(|e| Error::Protocol(format!("schedule response: {e}")))?;
    let entries =
        decode_day(&slots).map_err(|e| Error::Protocol(format!("schedule response: {e}")))?;
    Ok(DaySchedule { day, entries })
}

fn parse_week(body: &str) -> Result<Vec<DaySchedule>> {
    let parsed: Value = serde_json::from_str(body)
        .map_err(|e| Error::Protocol(format!("schedule response: {e}")))?;
    let mut days = Vec::new();
    for day in Day::ALL {
        let Some(slots) = parsed.pointer(&format!("/schedule/{}", day.as_api_str())) else {
            continue;
        };
        let slots: Vec<Slot> = serde_json::from_value(slots.clone())
            .map_err(|e| Error::Protocol(format!("schedule response: {e}")))?;
        let entries =
            decode_day(&slots).map_err(|e| Error::Protocol(format!("schedule response: {e}")))?;
        days.push(DaySchedule { day, entries });
    }
    if days.is_empty() {
        return Err(Error::Protocol(
            "response carried no day schedules".to_string(),
        ));
    }
    Ok(days)
}
