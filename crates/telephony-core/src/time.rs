//! Conversion between human-entered local date/times and wire timestamps.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Accepted input layouts, most specific first.
const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

const OUTPUT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Time zone used to interpret date/times typed by a user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InputZone {
    /// The machine's local zone, DST included.
    #[default]
    System,
    /// A fixed UTC offset.
    Fixed(FixedOffset),
}

impl InputZone {
    /// UTC.
    pub fn utc() -> Self {
        InputZone::Fixed(Utc.fix())
    }

    /// Convert user input into Unix seconds.
    ///
    /// Accepts bare Unix seconds, RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]`
    /// interpreted in this zone. Returns `None` for unparseable input and for
    /// local times skipped by a DST transition.
    pub fn to_unix(&self, input: &str) -> Option<i64> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        if let Ok(ts) = input.parse::<i64>() {
            return Some(ts);
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
            return Some(dt.timestamp());
        }

        let naive = INPUT_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())?;

        match self {
            InputZone::System => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.timestamp()),
            InputZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|dt| dt.timestamp()),
        }
    }

    /// Render Unix seconds as a local date/time suitable for editing.
    pub fn format(&self, timestamp: i64) -> Option<String> {
        let utc = DateTime::<Utc>::from_timestamp(timestamp, 0)?;
        let rendered = match self {
            InputZone::System => utc.with_timezone(&Local).format(OUTPUT_FORMAT).to_string(),
            InputZone::Fixed(offset) => utc.with_timezone(offset).format(OUTPUT_FORMAT).to_string(),
        };
        Some(rendered)
    }
}

/// Current Unix time in seconds.
pub fn unix_now() -> i64 {
    Utc::now().timestamp()
}

/// Parse a wire timestamp (number, numeric string, RFC 3339 or naive UTC).
pub(crate) fn wire_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => InputZone::utc().to_unix(s),
        _ => None,
    }
}

pub(crate) fn deserialize_unix_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    wire_timestamp(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_unix_formats() {
        let zone = InputZone::utc();
        assert_eq!(zone.to_unix("1800000000"), Some(1_800_000_000));
        assert_eq!(zone.to_unix("2027-01-15T08:00:00Z"), Some(1_800_000_000));
        assert_eq!(zone.to_unix("2027-01-15T08:00"), Some(1_800_000_000));
        assert_eq!(zone.to_unix("2027-01-15T08:00:01"), Some(1_800_000_001));
        assert_eq!(zone.to_unix("2027-01-15 08:00"), Some(1_800_000_000));
        assert_eq!(zone.to_unix(""), None);
        assert_eq!(zone.to_unix("next tuesday"), None);
    }

    #[test]
    fn test_to_unix_fixed_offset() {
        let Some(plus_two) = FixedOffset::east_opt(2 * 3600) else {
            panic!("valid offset");
        };
        let zone = InputZone::Fixed(plus_two);
        assert_eq!(zone.to_unix("2027-01-15T10:00"), Some(1_800_000_000));
        assert_eq!(zone.format(1_800_000_000).as_deref(), Some("2027-01-15T10:00:00"));
    }

    #[test]
    fn test_wire_timestamp() {
        assert_eq!(wire_timestamp(&serde_json::json!(1_800_000_000)), Some(1_800_000_000));
        assert_eq!(wire_timestamp(&serde_json::json!(1_800_000_000.9)), Some(1_800_000_000));
        assert_eq!(wire_timestamp(&serde_json::json!("1800000000")), Some(1_800_000_000));
        assert_eq!(wire_timestamp(&serde_json::json!(null)), None);
    }
}
