use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Counters for one generation run. Not persisted.
///
/// In a dry run the `*_created` counts are what the run would have created.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationStats {
    pub dry_run: bool,
    pub users_requested: u32,
    pub users_created: u32,
    pub events_requested: u32,
    pub events_created: u32,
    pub api_calls: u32,
    pub api_failures: u32,
    /// Completions that held no recoverable JSON array.
    pub parse_failures: u32,
    /// Individual records that failed validation.
    pub rejected_records: u32,
    /// Users whose event generation failed entirely.
    pub failed_users: Vec<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl GenerationStats {
    pub(crate) fn start(dry_run: bool) -> Self {
        GenerationStats {
            dry_run,
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    pub fn users_shortfall(&self) -> u32 {
        self.users_requested.saturating_sub(self.users_created)
    }

    pub fn events_shortfall(&self) -> u32 {
        self.events_requested.saturating_sub(self.events_created)
    }

    pub fn duration(&self) -> Option<Duration> {
        Some(self.finished_at? - self.started_at?)
    }

    /// Total recoverable failures seen during the run.
    pub fn failures(&self) -> u32 {
        self.api_failures + self.parse_failures + self.rejected_records
    }
}
