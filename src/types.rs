use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Time of day stored as minutes since midnight.
/// Parses the vendor's zero-padded 24-hour `HH:MM` form and nothing else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Strict `HH:MM` parse: two digits, colon, two digits, 00:00..23:59.
    pub fn parse(s: &str) -> Option<Self> {
        let b = s.as_bytes();
        if b.len() != 5 || b[2] != b':' {
            return None;
        }
        if !(b[0].is_ascii_digit()
            && b[1].is_ascii_digit()
            && b[3].is_ascii_digit()
            && b[4].is_ascii_digit())
        {
            return None;
        }
        let hours = u16::from(b[0] - b'0') * 10 + u16::from(b[1] - b'0');
        let minutes = u16::from(b[3] - b'0') * 10 + u16::from(b[4] - b'0');
        if hours > 23 || minutes > 59 {
            return None;
        }
        Some(Self(hours * 60 + minutes))
    }

    /// Construct from minutes since midnight, as the wire format carries it.
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        if minutes < 24 * 60 {
            Some(Self(minutes as u16))
        } else {
            None
        }
    }

    pub fn minutes(&self) -> u32 {
        u32::from(self.0)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Day {
    pub const ALL: [Day; 7] = [
        Day::Monday,
        Day::Tuesday,
        Day::Wednesday,
        Day::Thursday,
        Day::Friday,
        Day::Saturday,
        Day::Sunday,
    ];

    pub fn as_api_str(&self) -> &'static str {
        match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        }
    }

    pub fn from_api_str(s: &str) -> Option<Self> {
        match s {
            "monday" => Some(Day::Monday),
            "tuesday" => Some(Day::Tuesday),
            "wednesday" => Some(Day::Wednesday),
            "thursday" => Some(Day::Thursday),
            "friday" => Some(Day::Friday),
            "saturday" => Some(Day::Saturday),
            "sunday" => Some(Day::Sunday),
            _ => None,
        }
    }
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// One switching point: from `time` onward the node heats to `target` (°C)
/// until the next entry takes over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEntry {
    pub time: TimeOfDay,
    pub target: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DaySchedule {
    pub day: Day,
    pub entries: Vec<ScheduleEntry>,
}

/// Login input. Never stored; dropped after the token exchange.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub mfa_code: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            mfa_code: None,
        }
    }

    pub fn with_mfa_code(mut self, code: impl Into<String>) -> Self {
        self.mfa_code = Some(code.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("mfa_code", &self.mfa_code.as_deref().map(|_| "<redacted>"))
            .finish()
    }
}

/// The id/access/refresh token triple minted at login and replaced wholesale
/// on refresh. Serializable so the host can persist it between runs.
#[derive(Clone, Serialize, Deserialize)]
pub struct TokenSet {
    pub id_token: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
}

impl TokenSet {
    /// True once the bearer tokens are within 30 s of expiry.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at - Duration::seconds(30)
    }
}

impl fmt::Debug for TokenSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenSet")
            .field("id_token", &format_args!("<{} bytes>", self.id_token.len()))
            .field(
                "access_token",
                &format_args!("<{} bytes>", self.access_token.len()),
            )
            .field(
                "refresh_token",
                &format_args!("<{} bytes>", self.refresh_token.len()),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Explicit owner of the current token set, passed to every client call.
/// The host decides when to persist `tokens()`; a refresh replaces them here.
#[derive(Debug, Clone)]
pub struct Session {
    tokens: TokenSet,
}

impl Session {
    pub fn new(tokens: TokenSet) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &TokenSet {
        &self.tokens
    }

    pub fn into_tokens(self) -> TokenSet {
        self.tokens
    }

    pub(crate) fn replace(&mut self, tokens: TokenSet) {
        self.tokens = tokens;
    }
}
