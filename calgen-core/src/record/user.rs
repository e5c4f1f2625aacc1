//! Calendar users.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;
use super::fields::{self, RawRecord, StoredFields};
use crate::constants::{
    DEFAULT_CALENDAR_VIEW, DEFAULT_MEETING_DURATION, DEFAULT_PROFESSION, DEFAULT_TIMEZONE,
    DEFAULT_WORK_END, DEFAULT_WORK_START, USER_ID_PREFIX, USER_KEY_PREFIX,
};
use crate::error::CoreResult;

/// A generated calendar user. Never mutated once stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub timezone: String,
    pub profession: String,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preferences {
    pub working_hours: WorkingHours,
    /// Free text, e.g. "30 minutes"
    pub meeting_duration: String,
    /// Preferred calendar view ("day", "week", ...). Not constrained.
    pub calendar_view: String,
}

/// Working hours as HH:MM strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingHours {
    pub start: String,
    pub end: String,
}

impl Default for WorkingHours {
    fn default() -> Self {
        WorkingHours {
            start: DEFAULT_WORK_START.to_string(),
            end: DEFAULT_WORK_END.to_string(),
        }
    }
}

impl std::fmt::Display for WorkingHours {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.start, self.end)
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            working_hours: WorkingHours::default(),
            meeting_duration: DEFAULT_MEETING_DURATION.to_string(),
            calendar_view: DEFAULT_CALENDAR_VIEW.to_string(),
        }
    }
}

impl WorkingHours {
    /// Read `{"start": .., "end": ..}` or a `"09:00 - 17:00"` string.
    fn from_raw(value: &Value) -> Self {
        let defaults = WorkingHours::default();

        match value {
            Value::Object(obj) => WorkingHours {
                start: fields::text(obj, "start").unwrap_or(defaults.start),
                end: fields::text(obj, "end").unwrap_or(defaults.end),
            },
            Value::String(s) => match s.split_once('-') {
                Some((start, end)) if !start.trim().is_empty() && !end.trim().is_empty() => {
                    WorkingHours {
                        start: start.trim().to_string(),
                        end: end.trim().to_string(),
                    }
                }
                _ => defaults,
            },
            _ => defaults,
        }
    }
}

impl Preferences {
    fn from_raw(raw: &RawRecord) -> Self {
        let defaults = Preferences::default();

        Preferences {
            working_hours: raw
                .get("working_hours")
                .map(WorkingHours::from_raw)
                .unwrap_or(defaults.working_hours),
            meeting_duration: fields::text_any(
                raw,
                &["meeting_duration", "meeting_duration_preference", "preferred_meeting_duration"],
            )
            .unwrap_or(defaults.meeting_duration),
            calendar_view: fields::text_any(raw, &["calendar_view", "preferred_view", "view"])
                .unwrap_or(defaults.calendar_view),
        }
    }
}

impl User {
    /// Build a user from a loosely-typed JSON object.
    ///
    /// `name` and `email` are required. A missing `user_id` or `created_at`
    /// is generated; other missing fields take their defaults.
    pub fn from_raw(value: &Value) -> CoreResult<Self> {
        let raw = fields::as_object(value, "user")?;

        let name = fields::required_text(raw, "name", "user")?;
        let email = fields::required_text(raw, "email", "user")?;

        let created_at = fields::timestamp(raw, "created_at", Utc::now().date_naive())?
            .unwrap_or_else(Utc::now);

        let preferences = match raw.get("preferences") {
            Some(Value::Object(prefs)) => Preferences::from_raw(prefs),
            _ => Preferences::from_raw(raw),
        };

        Ok(User {
            user_id: fields::text(raw, "user_id")
                .unwrap_or_else(|| fields::generate_id(USER_ID_PREFIX)),
            name,
            email,
            timezone: fields::text(raw, "timezone").unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
            profession: fields::text_any(raw, &["profession", "job_title", "occupation"])
                .unwrap_or_else(|| DEFAULT_PROFESSION.to_string()),
            preferences,
            created_at,
        })
    }
}

impl Record for User {
    const KEY_PREFIX: &'static str = USER_KEY_PREFIX;

    fn id(&self) -> &str {
        &self.user_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn to_fields(&self) -> CoreResult<Vec<(&'static str, String)>> {
        Ok(vec![
            ("user_id", self.user_id.clone()),
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("timezone", self.timezone.clone()),
            ("profession", self.profession.clone()),
            ("preferences", serde_json::to_string(&self.preferences)?),
            ("created_at", fields::format_timestamp(&self.created_at)),
        ])
    }

    fn from_fields(key: &str, fields: &HashMap<String, String>) -> CoreResult<Self> {
        let stored = StoredFields::new(key, fields);

        Ok(User {
            user_id: stored.get("user_id")?,
            name: stored.get("name")?,
            email: stored.get("email")?,
            timezone: stored.get("timezone")?,
            profession: stored.get("profession")?,
            preferences: stored.json("preferences")?,
            created_at: stored.timestamp("created_at")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use serde_json::json;

    #[test]
    fn test_from_raw_fills_defaults() {
        let user = User::from_raw(&json!({"name": "Ada Lovelace", "email": "ada@example.com"})).unwrap();

        assert!(user.user_id.starts_with(USER_ID_PREFIX));
        assert_eq!(user.timezone, DEFAULT_TIMEZONE);
        assert_eq!(user.profession, DEFAULT_PROFESSION);
        assert_eq!(user.preferences, Preferences::default());
    }

    #[test]
    fn test_from_raw_reads_nested_preferences() {
        let user = User::from_raw(&json!({
            "name": "Grace Hopper",
            "email": "grace@example.com",
            "timezone": "America/New_York",
            "profession": "Rear Admiral",
            "preferences": {
                "working_hours": {"start": "08:00", "end": "16:30"},
                "meeting_duration": "45 minutes",
                "calendar_view": "month"
            }
        }))
        .unwrap();

        assert_eq!(user.preferences.working_hours.start, "08:00");
        assert_eq!(user.preferences.working_hours.end, "16:30");
        assert_eq!(user.preferences.meeting_duration, "45 minutes");
        assert_eq!(user.preferences.calendar_view, "month");
        assert_eq!(user.preferences.working_hours.to_string(), "08:00 - 16:30");
    }

    #[test]
    fn test_from_raw_accepts_working_hours_string() {
        let user = User::from_raw(&json!({
            "name": "Linus",
            "email": "linus@example.com",
            "preferences": {"working_hours": "10:00 - 18:00"}
        }))
        .unwrap();

        assert_eq!(user.preferences.working_hours.start, "10:00");
        assert_eq!(user.preferences.working_hours.end, "18:00");
    }

    #[test]
    fn test_from_raw_requires_name_and_email() {
        let missing_email = User::from_raw(&json!({"name": "Nobody"}));
        assert!(matches!(missing_email, Err(CoreError::Validation(_))));

        let blank_name = User::from_raw(&json!({"name": "", "email": "x@example.com"}));
        assert!(matches!(blank_name, Err(CoreError::Validation(_))));

        let not_object = User::from_raw(&json!("just a string"));
        assert!(matches!(not_object, Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_flat_fields_roundtrip() {
        let user = User::from_raw(&json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "timezone": "Europe/London",
        }))
        .unwrap();

        let fields: HashMap<String, String> = user
            .to_fields()
            .unwrap()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();

        let restored = User::from_fields(&user.key(), &fields).unwrap();
        assert_eq!(restored, user);
    }

    #[test]
    fn test_json_roundtrip() {
        let user = User::from_raw(&json!({"name": "Ada", "email": "ada@example.com"})).unwrap();
        let encoded = serde_json::to_string(&user).unwrap();
        let decoded: User = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, user);
    }

    #[test]
    fn test_from_fields_reports_missing_field() {
        let fields = HashMap::from([("user_id".to_string(), "user_1".to_string())]);
        let err = User::from_fields("user:user_1", &fields).unwrap_err();
        assert!(matches!(err, CoreError::CorruptRecord { .. }));
    }
}
