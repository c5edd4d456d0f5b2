use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::schedule::{ValidationError, parse_entries, validate_entries};
use crate::types::ScheduleEntry;
use crate::{Error, Result};

#[derive(Debug, Deserialize)]
struct RawEntry {
    time: String,
    temp: f64,
}

/// Named, reusable day-schedule templates. Every profile is validated with
/// the same rules as explicit entries when the store is loaded, so a profile
/// that resolves at call time is always sendable.
#[derive(Debug, Clone, Default)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Vec<ScheduleEntry>>,
}

impl ProfileStore {
    /// Load from a JSON document mapping profile names to entry lists:
    /// `{"weekday": [{"time": "06:30", "temp": 18.0}, ...], ...}`.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<RawEntry>> =
            serde_json::from_str(s).map_err(|e| Error::Protocol(format!("profile store: {e}")))?;

        let mut profiles = BTreeMap::new();
        for (name, raw_entries) in raw {
            let pairs: Vec<(String, f64)> = raw_entries
                .into_iter()
                .map(|entry| (entry.time, entry.temp))
                .collect();
            let entries = parse_entries(&pairs).map_err(|e| in_profile(&name, e))?;
            validate_entries(&entries).map_err(|e| in_profile(&name, e))?;
            profiles.insert(name, entries);
        }
        debug!(count = profiles.len(), "loaded schedule profiles");
        Ok(Self { profiles })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn get(&self, name: &str) -> Option<&[ScheduleEntry]> {
        self.profiles.get(name).map(Vec::as_slice)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn in_profile(name: &str, reason: ValidationError) -> Error {
    Error::Validation(ValidationError::Profile {
        name: name.to_string(),
        reason: Box::new(reason),
    })
}
