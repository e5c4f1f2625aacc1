/// Index set holding every stored user id.
pub const USERS_INDEX: &str = "users";

/// Index set holding every stored event id.
pub const EVENTS_INDEX: &str = "events";

pub const USER_KEY_PREFIX: &str = "user:";
pub const EVENT_KEY_PREFIX: &str = "event:";
pub const USER_EVENTS_KEY_PREFIX: &str = "user_events:";
pub const EMAIL_KEY_PREFIX: &str = "email:";

/// Prefixes of generated record ids.
pub const USER_ID_PREFIX: &str = "user_";
pub const EVENT_ID_PREFIX: &str = "event_";

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_PROFESSION: &str = "Professional";
pub const DEFAULT_WORK_START: &str = "09:00";
pub const DEFAULT_WORK_END: &str = "17:00";
pub const DEFAULT_MEETING_DURATION: &str = "30 minutes";
pub const DEFAULT_CALENDAR_VIEW: &str = "week";

/// Length of an event when the model omits `end_time`.
pub const DEFAULT_EVENT_MINUTES: i64 = 60;
