//! Calendar events owned by generated users.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Record;
use super::fields::{self, StoredFields};
use crate::constants::{DEFAULT_EVENT_MINUTES, EVENT_ID_PREFIX, EVENT_KEY_PREFIX};
use crate::error::CoreResult;

/// A generated calendar event.
///
/// `user_id` refers to the owning `User` but the store does not check that
/// the user exists. `start_time < end_time` is not enforced either: models
/// occasionally produce inverted ranges and those are kept as generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub event_id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub attendees: Vec<String>,
    pub category: EventCategory,
    pub priority: Priority,
    pub recurrence: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Meeting,
    Appointment,
    #[default]
    Personal,
    Work,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    #[default]
    Low,
}

impl EventCategory {
    pub const ALL: [EventCategory; 4] = [
        EventCategory::Meeting,
        EventCategory::Appointment,
        EventCategory::Personal,
        EventCategory::Work,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Meeting => "meeting",
            EventCategory::Appointment => "appointment",
            EventCategory::Personal => "personal",
            EventCategory::Work => "work",
        }
    }

    /// Case-insensitive match; anything unrecognised becomes the default.
    pub fn from_loose(s: &str) -> Self {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_default()
    }
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::High, Priority::Medium, Priority::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// Case-insensitive match; anything unrecognised becomes the default.
    pub fn from_loose(s: &str) -> Self {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .unwrap_or_default()
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CalendarEvent {
    /// Build an event for `user_id` from a loosely-typed JSON object.
    ///
    /// `title` is required. Bare times (`"14:30"`) land on the creation
    /// date, a missing start defaults to the creation time and a missing
    /// end to one hour after the start.
    pub fn from_raw(value: &Value, user_id: &str) -> CoreResult<Self> {
        let raw = fields::as_object(value, "event")?;

        let title = fields::required_text(raw, "title", "event")?;

        let now = Utc::now();
        let created_at = fields::timestamp(raw, "created_at", now.date_naive())?.unwrap_or(now);
        let base_date = created_at.date_naive();

        let start_time = fields::timestamp(raw, "start_time", base_date)?.unwrap_or(created_at);
        let end_time = fields::timestamp(raw, "end_time", base_date)?
            .unwrap_or(start_time + Duration::minutes(DEFAULT_EVENT_MINUTES));

        let recurrence = fields::text(raw, "recurrence")
            .filter(|r| !r.eq_ignore_ascii_case("none") && !r.eq_ignore_ascii_case("null"));

        Ok(CalendarEvent {
            event_id: fields::text(raw, "event_id")
                .unwrap_or_else(|| fields::generate_id(EVENT_ID_PREFIX)),
            user_id: user_id.to_string(),
            title,
            description: fields::text(raw, "description").unwrap_or_default(),
            location: fields::text(raw, "location").unwrap_or_default(),
            start_time,
            end_time,
            attendees: fields::string_list(raw, "attendees"),
            category: fields::text(raw, "category")
                .map(|c| EventCategory::from_loose(&c))
                .unwrap_or_default(),
            priority: fields::text(raw, "priority")
                .map(|p| Priority::from_loose(&p))
                .unwrap_or_default(),
            recurrence,
            created_at,
        })
    }
}

impl Record for CalendarEvent {
    const KEY_PREFIX: &'static str = EVENT_KEY_PREFIX;

    fn id(&self) -> &str {
        &self.event_id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn to_fields(&self) -> CoreResult<Vec<(&'static str, String)>> {
        let mut out = vec![
            ("event_id", self.event_id.clone()),
            ("user_id", self.user_id.clone()),
            ("title", self.title.clone()),
            ("description", self.description.clone()),
            ("location", self.location.clone()),
            ("start_time", fields::format_timestamp(&self.start_time)),
            ("end_time", fields::format_timestamp(&self.end_time)),
            ("attendees", serde_json::to_string(&self.attendees)?),
            ("category", self.category.to_string()),
            ("priority", self.priority.to_string()),
            ("created_at", fields::format_timestamp(&self.created_at)),
        ];

        // Absent field means no recurrence.
        if let Some(recurrence) = &self.recurrence {
            out.push(("recurrence", recurrence.clone()));
        }

        Ok(out)
    }

    fn from_fields(key: &str, fields: &HashMap<String, String>) -> CoreResult<Self> {
        let stored = StoredFields::new(key, fields);

        Ok(CalendarEvent {
            event_id: stored.get("event_id")?,
            user_id: stored.get("user_id")?,
            title: stored.get("title")?,
            description: stored.optional("description").unwrap_or_default(),
            location: stored.optional("location").unwrap_or_default(),
            start_time: stored.timestamp("start_time")?,
            end_time: stored.timestamp("end_time")?,
            attendees: stored.json("attendees")?,
            category: EventCategory::from_loose(&stored.get("category")?),
            priority: Priority::from_loose(&stored.get("priority")?),
            recurrence: stored.optional("recurrence"),
            created_at: stored.timestamp("created_at")?,
        })
    }
}
