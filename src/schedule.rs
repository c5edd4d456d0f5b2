use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{Day, ScheduleEntry, TimeOfDay};

pub const MIN_TARGET_C: f64 = 5.0;
pub const MAX_TARGET_C: f64 = 32.0;

/// Rejected schedule input, naming the offending entry.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    EmptySchedule,
    BadTimeFormat { index: usize, value: String },
    TargetOutOfRange { index: usize, target: f64 },
    UnorderedStart { index: usize, start: TimeOfDay },
    DuplicateStart { index: usize, start: TimeOfDay },
    BadStart { index: usize, start: u32 },
    UnknownProfile(String),
    MissingScheduleSource,
    DuplicateDay(Day),
    Profile { name: String, reason: Box<ValidationError> },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptySchedule => write!(f, "schedule has no entries"),
            ValidationError::BadTimeFormat { index, value } => write!(
                f,
                "entry {index}: bad time of day {value:?} (expected zero-padded 24-hour HH:MM)"
            ),
            ValidationError::TargetOutOfRange { index, target } => write!(
                f,
                "entry {index}: target {target}\u{00b0}C outside {MIN_TARGET_C}..{MAX_TARGET_C}\u{00b0}C"
            ),
            ValidationError::UnorderedStart { index, start } => {
                write!(f, "entry {index}: start {start} is not after the previous entry")
            }
            ValidationError::DuplicateStart { index, start } => {
                write!(f, "entry {index}: duplicate start {start}")
            }
            ValidationError::BadStart { index, start } => {
                write!(f, "slot {index}: start {start} is not a minute of the day")
            }
            ValidationError::UnknownProfile(name) => write!(f, "unknown profile {name:?}"),
            ValidationError::MissingScheduleSource => {
                write!(f, "neither a profile nor explicit schedule entries were supplied")
            }
            ValidationError::DuplicateDay(day) => {
                write!(f, "day {day} appears more than once")
            }
            ValidationError::Profile { name, reason } => write!(f, "profile {name:?}: {reason}"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// One wire slot: `{"value": {"target": 18.0}, "start": 390}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub value: SlotValue,
    pub start: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotValue {
    pub target: f64,
}

/// Parse raw `("HH:MM", target)` pairs as supplied by the host or a profile
/// file. Time-format errors carry the entry index and the rejected value.
pub fn parse_entries<S: AsRef<str>>(
    raw: &[(S, f64)],
) -> Result<Vec<ScheduleEntry>, ValidationError> {
    raw.iter()
        .enumerate()
        .map(|(index, (time, target))| {
            let time = TimeOfDay::parse(time.as_ref()).ok_or_else(|| {
                ValidationError::BadTimeFormat {
                    index,
                    value: time.as_ref().to_string(),
                }
            })?;
            Ok(ScheduleEntry {
                time,
                target: *target,
            })
        })
        .collect()
}

/// A valid day is non-empty, strictly ascending by start time (duplicates are
/// rejected, not deduplicated) and stays inside the node's target range.
pub fn validate_entries(entries: &[ScheduleEntry]) -> Result<(), ValidationError> {
    if entries.is_empty() {
        return Err(ValidationError::EmptySchedule);
    }
    let mut previous: Option<TimeOfDay> = None;
    for (index, entry) in entries.iter().enumerate() {
        if !(MIN_TARGET_C..=MAX_TARGET_C).contains(&entry.target) {
            return Err(ValidationError::TargetOutOfRange {
                index,
                target: entry.target,
            });
        }
        if let Some(previous) = previous {
            if entry.time == previous {
                return Err(ValidationError::DuplicateStart {
                    index,
                    start: entry.time,
                });
            }
            if entry.time < previous {
                return Err(ValidationError::UnorderedStart {
                    index,
                    start: entry.time,
                });
            }
        }
        previous = Some(entry.time);
    }
    Ok(())
}

/// Validate and convert a day's entries into wire slots.
pub fn encode_day(entries: &[ScheduleEntry]) -> Result<Vec<Slot>, ValidationError> {
    validate_entries(entries)?;
    Ok(entries
        .iter()
        .map(|entry| Slot {
            value: SlotValue {
                target: entry.target,
            },
            start: entry.time.minutes(),
        })
        .collect())
}

/// Convert wire slots back into entries, applying the same rules.
pub fn decode_day(slots: &[Slot]) -> Result<Vec<ScheduleEntry>, ValidationError> {
    let entries = slots
        .iter()
        .enumerate()
        .map(|(index, slot)| {
            let time = TimeOfDay::from_minutes(slot.start).ok_or(ValidationError::BadStart {
                index,
                start: slot.start,
            })?;
            Ok(ScheduleEntry {
                time,
                target: slot.value.target,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    validate_entries(&entries)?;
    Ok(entries)
}

/// Single-day update body: `{"schedule": {"<day>": [<slots>]}}`.
pub fn day_payload(day: Day, slots: &[Slot]) -> Value {
    let mut days = Map::new();
    days.insert(
        day.as_api_str().to_string(),
        serde_json::to_value(slots).unwrap_or(Value::Null),
    );
    let mut root = Map::new();
    root.insert("schedule".to_string(), Value::Object(days));
    Value::Object(root)
}

/// Multi-day update body carrying only the given days.
pub fn week_payload(days: &[(Day, Vec<Slot>)]) -> Value {
    let mut day_map = Map::new();
    for (day, slots) in days {
        day_map.insert(
            day.as_api_str().to_string(),
            serde_json::to_value(slots).unwrap_or(Value::Null),
        );
    }
    let mut root = Map::new();
    root.insert("schedule".to_string(), Value::Object(day_map));
    Value::Object(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entries(raw: &[(&str, f64)]) -> Vec<ScheduleEntry> {
        parse_entries(raw).expect("test entries should parse")
    }

    #[test]
    fn encode_accepts_range_boundaries() {
        let slots = encode_day(&entries(&[("00:00", 5.0), ("12:00", 32.0)])).unwrap();
        assert_eq!(slots[0].value.target, 5.0);
        assert_eq!(slots[1].value.target, 32.0);
    }

    #[test]
    fn encode_rejects_just_outside_range() {
        let err = encode_day(&entries(&[("00:00", 4.9)])).unwrap_err();
        assert!(matches!(err, ValidationError::TargetOutOfRange { index: 0, .. }));
        let err = encode_day(&entries(&[("00:00", 32.1)])).unwrap_err();
        assert!(matches!(err, ValidationError::TargetOutOfRange { index: 0, .. }));
    }

    #[test]
    fn day_payload_shape() {
        let slots = encode_day(&entries(&[("06:30", 18.0)])).unwrap();
        let payload = day_payload(Day::Friday, &slots);
        assert_eq!(
            payload,
            serde_json::json!({"schedule": {"friday": [{"value": {"target": 18.0}, "start": 390}]}})
        );
    }

    #[test]
    fn decode_rejects_start_past_midnight() {
        let slots = vec![Slot {
            value: SlotValue { target: 18.0 },
            start: 1440,
        }];
        let err = decode_day(&slots).unwrap_err();
        assert!(matches!(err, ValidationError::BadStart { index: 0, start: 1440 }));
    }

    #[test]
    fn slot_serde_roundtrip() {
        let slot = Slot {
            value: SlotValue { target: 19.5 },
            start: 990,
        };
        let json = serde_json::to_string(&slot).unwrap();
        assert_eq!(json, r#"{"value":{"target":19.5},"start":990}"#);
        let back: Slot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, slot);
    }
}
