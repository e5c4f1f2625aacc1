//! Field helpers shared by the record types.
//!
//! Two directions are covered here: reading loosely-typed JSON as decoded
//! from a completion, and reading/writing the flat string mappings kept in
//! the key-value store.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::error::{CoreError, CoreResult};

/// A record as decoded from model output, before any validation.
pub type RawRecord = Map<String, Value>;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Generate an id such as `user_1a2b3c4d`.
pub fn generate_id(prefix: &str) -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("{}{}", prefix, &hex[..8])
}

pub fn as_object<'a>(value: &'a Value, entity: &str) -> CoreResult<&'a RawRecord> {
    value
        .as_object()
        .ok_or_else(|| CoreError::Validation(format!("{} entry is not a JSON object", entity)))
}

/// Read a scalar field as trimmed text.
/// Numbers and booleans are stringified; null and empty strings count as missing.
pub fn text(raw: &RawRecord, key: &str) -> Option<String> {
    let s = match raw.get(key)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };

    if s.is_empty() { None } else { Some(s) }
}

/// First present key wins.
pub fn text_any(raw: &RawRecord, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| text(raw, key))
}

pub fn required_text(raw: &RawRecord, key: &str, entity: &str) -> CoreResult<String> {
    text(raw, key)
        .ok_or_else(|| CoreError::Validation(format!("{} is missing required field '{}'", entity, key)))
}

/// Read a list of strings.
///
/// Accepts a JSON array (objects contribute their `email` or `name`) or a
/// single comma-separated string.
pub fn string_list(raw: &RawRecord, key: &str) -> Vec<String> {
    match raw.get(key) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Object(obj) => text_any(obj, &["email", "name"]),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|part| part.trim().to_string())
            .filter(|part| !part.is_empty())
            .collect(),
        _ => Vec::new(),
    }
}

/// Parse a timestamp the way models tend to write them.
///
/// RFC 3339 (including a `Z` suffix), naive date-times (taken as UTC),
/// plain dates (midnight) and bare times, which are placed on `date`.
pub fn parse_timestamp(s: &str, date: NaiveDate) -> Option<DateTime<Utc>> {
    let s = s.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc());
        }
    }

    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(s, format).ok())
        .map(|t| date.and_time(t).and_utc())
}

/// Read an optional timestamp field. Absent is `Ok(None)`, unparseable is a validation error.
pub fn timestamp(raw: &RawRecord, key: &str, date: NaiveDate) -> CoreResult<Option<DateTime<Utc>>> {
    let Some(s) = text(raw, key) else {
        return Ok(None);
    };

    parse_timestamp(&s, date)
        .map(Some)
        .ok_or_else(|| CoreError::Validation(format!("invalid timestamp '{}' in '{}'", s, key)))
}

/// Timestamps are stored as RFC 3339 UTC with as much sub-second precision as they carry.
pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// A flat field mapping read back from the store.
pub struct StoredFields<'a> {
    key: &'a str,
    fields: &'a HashMap<String, String>,
}

impl<'a> StoredFields<'a> {
    pub fn new(key: &'a str, fields: &'a HashMap<String, String>) -> Self {
        StoredFields { key, fields }
    }

    fn corrupt(&self, reason: String) -> CoreError {
        CoreError::CorruptRecord {
            key: self.key.to_string(),
            reason,
        }
    }

    pub fn get(&self, name: &str) -> CoreResult<String> {
        self.fields
            .get(name)
            .cloned()
            .ok_or_else(|| self.corrupt(format!("missing field '{}'", name)))
    }

    pub fn optional(&self, name: &str) -> Option<String> {
        self.fields.get(name).cloned()
    }

    pub fn timestamp(&self, name: &str) -> CoreResult<DateTime<Utc>> {
        let value = self.get(name)?;
        DateTime::parse_from_rfc3339(&value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| self.corrupt(format!("bad timestamp in '{}': {}", name, e)))
    }

    pub fn json<T: DeserializeOwned>(&self, name: &str) -> CoreResult<T> {
        let value = self.get(name)?;
        serde_json::from_str(&value).map_err(|e| self.corrupt(format!("bad JSON in '{}': {}", name, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap()
    }

    #[test]
    fn test_generate_id_has_prefix_and_eight_hex_chars() {
        let id = generate_id("user_");
        assert!(id.starts_with("user_"));
        let suffix = &id["user_".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_text_treats_blank_as_missing() {
        let raw = json!({"name": "   ", "age": 41, "ok": true});
        let raw = raw.as_object().unwrap();
        assert_eq!(text(raw, "name"), None);
        assert_eq!(text(raw, "age").as_deref(), Some("41"));
        assert_eq!(text(raw, "ok").as_deref(), Some("true"));
        assert_eq!(text(raw, "absent"), None);
    }

    #[test]
    fn test_string_list_accepts_arrays_objects_and_csv() {
        let raw = json!({
            "a": ["x@example.com", {"email": "y@example.com"}, ""],
            "b": "p@example.com, q@example.com",
        });
        let raw = raw.as_object().unwrap();
        assert_eq!(string_list(raw, "a"), vec!["x@example.com", "y@example.com"]);
        assert_eq!(string_list(raw, "b"), vec!["p@example.com", "q@example.com"]);
        assert!(string_list(raw, "c").is_empty());
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 20, 15, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-03-20T15:00:00Z", day()), Some(expected));
        assert_eq!(parse_timestamp("2025-03-20T16:00:00+01:00", day()), Some(expected));
        assert_eq!(parse_timestamp("2025-03-20T15:00:00", day()), Some(expected));
        assert_eq!(parse_timestamp("2025-03-20T15:00", day()), Some(expected));
        assert_eq!(parse_timestamp("2025-03-20 15:00", day()), Some(expected));
        assert_eq!(parse_timestamp("15:00", day()), Some(expected));
        assert_eq!(parse_timestamp("tomorrow-ish", day()), None);
    }

    #[test]
    fn test_timestamp_field_rejects_garbage() {
        let raw = json!({"start_time": "soon"});
        let raw = raw.as_object().unwrap();
        assert!(matches!(
            timestamp(raw, "start_time", day()),
            Err(CoreError::Validation(_))
        ));
        assert!(timestamp(raw, "end_time", day()).unwrap().is_none());
    }

    #[test]
    fn test_format_timestamp_keeps_subseconds() {
        let dt = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let s = format_timestamp(&dt);
        assert!(s.ends_with('Z'));
        let parsed = DateTime::parse_from_rfc3339(&s).unwrap().with_timezone(&Utc);
        assert_eq!(parsed, dt);
    }
}
