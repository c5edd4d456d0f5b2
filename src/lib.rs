mod auth;
mod client;
mod error;
mod logger;
mod profiles;
mod schedule;
mod types;

pub use auth::{Authenticator, AuthenticatorBuilder, DEFAULT_CLIENT_ID, DEFAULT_REGION};
pub use client::{DEFAULT_API_URL, HiveClient, HiveClientBuilder, SetDayScheduleRequest};
pub use error::{Error, Result};
pub use logger::MessageLogMode;
pub use profiles::ProfileStore;
pub use schedule::{
    MAX_TARGET_C, MIN_TARGET_C, Slot, SlotValue, ValidationError, day_payload, decode_day,
    encode_day, parse_entries, validate_entries, week_payload,
};
pub use types::*;
