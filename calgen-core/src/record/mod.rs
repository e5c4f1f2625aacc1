//! Record types and their storage encoding.

mod event;
pub mod fields;
mod user;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::CoreResult;

pub use event::{CalendarEvent, EventCategory, Priority};
pub use user::{Preferences, User, WorkingHours};

/// A record stored as one flat field mapping under `{KEY_PREFIX}{id}`.
///
/// Nested values are JSON-encoded and timestamps are RFC 3339, so
/// `from_fields(to_fields(x)) == x` for every record.
pub trait Record: Sized {
    const KEY_PREFIX: &'static str;

    fn id(&self) -> &str;

    fn created_at(&self) -> DateTime<Utc>;

    fn to_fields(&self) -> CoreResult<Vec<(&'static str, String)>>;

    fn from_fields(key: &str, fields: &HashMap<String, String>) -> CoreResult<Self>;

    fn key_for(id: &str) -> String {
        format!("{}{}", Self::KEY_PREFIX, id)
    }

    fn key(&self) -> String {
        Self::key_for(self.id())
    }
}
