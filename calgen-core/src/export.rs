//! Writing the stored dataset to files.
//!
//! Every export writes two files into the output directory,
//! `users_{stamp}.{ext}` and `events_{stamp}.{ext}`. An empty store
//! produces `[]` JSON files or header-only CSV files.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::kv::KvStore;
use crate::record::fields::format_timestamp;
use crate::record::{CalendarEvent, User};
use crate::store::Store;

const USER_COLUMNS: [&str; 7] = [
    "user_id",
    "name",
    "email",
    "timezone",
    "profession",
    "preferences",
    "created_at",
];

const EVENT_COLUMNS: [&str; 12] = [
    "event_id",
    "user_id",
    "title",
    "description",
    "location",
    "start_time",
    "end_time",
    "attendees",
    "category",
    "priority",
    "recurrence",
    "created_at",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(CoreError::Config(format!(
                "Unknown export format '{}' (expected json or csv)",
                other
            ))),
        }
    }
}

/// The files written by one export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFiles {
    pub format: ExportFormat,
    pub users: PathBuf,
    pub events: PathBuf,
    pub user_count: usize,
    pub event_count: usize,
}

/// Timestamp used in exported file names, e.g. `20250115_103000`.
pub fn file_stamp() -> String {
    Utc::now().format("%Y%m%d_%H%M%S").to_string()
}

pub struct Exporter<'a, K: KvStore> {
    store: &'a Store<K>,
}

impl<'a, K: KvStore> Exporter<'a, K> {
    pub fn new(store: &'a Store<K>) -> Self {
        Exporter { store }
    }

    pub async fn export_json(&self, dir: &Path, stamp: &str) -> CoreResult<ExportedFiles> {
        self.export(&[ExportFormat::Json], dir, stamp)
            .await
            .map(|mut files| files.remove(0))
    }

    pub async fn export_csv(&self, dir: &Path, stamp: &str) -> CoreResult<ExportedFiles> {
        self.export(&[ExportFormat::Csv], dir, stamp)
            .await
            .map(|mut files| files.remove(0))
    }

    /// Read the store once and write each format.
    pub async fn export(
        &self,
        formats: &[ExportFormat],
        dir: &Path,
        stamp: &str,
    ) -> CoreResult<Vec<ExportedFiles>> {
        if formats.is_empty() {
            return Err(CoreError::Config("No export formats given".into()));
        }

        let users = self.store.all_users().await?;
        let events = self.store.all_events().await?;

        fs::create_dir_all(dir)?;

        let mut written = Vec::with_capacity(formats.len());
        for &format in formats {
            let users_path = dir.join(format!("users_{}.{}", stamp, format.extension()));
            let events_path = dir.join(format!("events_{}.{}", stamp, format.extension()));

            match format {
                ExportFormat::Json => {
                    write_json(&users_path, &users)?;
                    write_json(&events_path, &events)?;
                }
                ExportFormat::Csv => {
                    write_users_csv(&users_path, &users)?;
                    write_events_csv(&events_path, &events)?;
                }
            }

            tracing::info!(
                %format,
                users = users.len(),
                events = events.len(),
                dir = %dir.display(),
                "exported"
            );

            written.push(ExportedFiles {
                format,
                users: users_path,
                events: events_path,
                user_count: users.len(),
                event_count: events.len(),
            });
        }

        Ok(written)
    }
}

fn write_json<T: Serialize>(path: &Path, records: &[T]) -> CoreResult<()> {
    let json = serde_json::to_string_pretty(records)?;
    fs::write(path, json)?;
    Ok(())
}

fn write_users_csv(path: &Path, users: &[User]) -> CoreResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(USER_COLUMNS)?;

    for user in users {
        writer.write_record([
            user.user_id.clone(),
            user.name.clone(),
            user.email.clone(),
            user.timezone.clone(),
            user.profession.clone(),
            serde_json::to_string(&user.preferences)?,
            format_timestamp(&user.created_at),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

fn write_events_csv(path: &Path, events: &[CalendarEvent]) -> CoreResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(EVENT_COLUMNS)?;

    for event in events {
        writer.write_record([
            event.event_id.clone(),
            event.user_id.clone(),
            event.title.clone(),
            event.description.clone(),
            event.location.clone(),
            format_timestamp(&event.start_time),
            format_timestamp(&event.end_time),
            serde_json::to_string(&event.attendees)?,
            event.category.to_string(),
            event.priority.to_string(),
            event.recurrence.clone().unwrap_or_default(),
            format_timestamp(&event.created_at),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;
    use serde_json::{Value, json};

    async fn seeded_store() -> Store<MemoryStore> {
        let store = Store::new(MemoryStore::new());
        let user = User::from_raw(&json!({
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "profession": "Mathematician"
        }))
        .unwrap();
        let event = CalendarEvent::from_raw(
            &json!({
                "title": "Design review, round 2",
                "start_time": "2025-01-15T10:00:00Z",
                "attendees": ["bob@example.com", "carol@example.com"],
                "category": "meeting",
                "priority": "high"
            }),
            &user.user_id,
        )
        .unwrap();
        store.put_user(&user).await.unwrap();
        store.put_event(&event).await.unwrap();
        store
    }

    #[test]
    fn test_format_from_str() {
        assert_eq!("JSON".parse::<ExportFormat>().unwrap(), ExportFormat::Json);
        assert_eq!(" csv ".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_empty_store_exports_empty_arrays() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(MemoryStore::new());

        let files = Exporter::new(&store)
            .export_json(dir.path(), "test")
            .await
            .unwrap();

        assert_eq!(files.users, dir.path().join("users_test.json"));
        let users: Value = serde_json::from_str(&fs::read_to_string(&files.users).unwrap()).unwrap();
        let events: Value =
            serde_json::from_str(&fs::read_to_string(&files.events).unwrap()).unwrap();
        assert_eq!(users, json!([]));
        assert_eq!(events, json!([]));
    }

    #[tokio::test]
    async fn test_empty_store_exports_header_only_csv() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(MemoryStore::new());

        let files = Exporter::new(&store)
            .export_csv(dir.path(), "test")
            .await
            .unwrap();

        let users = fs::read_to_string(&files.users).unwrap();
        assert_eq!(users.trim_end(), USER_COLUMNS.join(","));
        let events = fs::read_to_string(&files.events).unwrap();
        assert_eq!(events.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_json_export_matches_stored_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store().await;

        let files = Exporter::new(&store)
            .export_json(dir.path(), "run")
            .await
            .unwrap();

        let users: Vec<User> =
            serde_json::from_str(&fs::read_to_string(&files.users).unwrap()).unwrap();
        let events: Vec<CalendarEvent> =
            serde_json::from_str(&fs::read_to_string(&files.events).unwrap()).unwrap();

        assert_eq!(users, store.all_users().await.unwrap());
        assert_eq!(events, store.all_events().await.unwrap());
        assert_eq!(files.event_count, 1);
    }

    #[tokio::test]
    async fn test_csv_encodes_nested_fields_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store().await;

        let files = Exporter::new(&store)
            .export_csv(dir.path(), "run")
            .await
            .unwrap();

        let mut reader = csv::Reader::from_path(&files.events).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.iter().collect::<Vec<_>>(), EVENT_COLUMNS);

        let row = reader.records().next().unwrap().unwrap();
        assert_eq!(&row[2], "Design review, round 2");
        let attendees: Vec<String> = serde_json::from_str(&row[7]).unwrap();
        assert_eq!(attendees, vec!["bob@example.com", "carol@example.com"]);
        assert_eq!(&row[8], "meeting");
        assert_eq!(&row[9], "high");
        assert_eq!(&row[10], "");

        let mut reader = csv::Reader::from_path(&files.users).unwrap();
        let row = reader.records().next().unwrap().unwrap();
        let prefs: Value = serde_json::from_str(&row[5]).unwrap();
        assert_eq!(prefs["working_hours"]["start"], "09:00");
    }

    #[tokio::test]
    async fn test_export_writes_each_format() {
        let dir = tempfile::tempdir().unwrap();
        let store = seeded_store().await;
        let out = dir.path().join("nested/out");

        let files = Exporter::new(&store)
            .export(&[ExportFormat::Json, ExportFormat::Csv], &out, "both")
            .await
            .unwrap();

        assert_eq!(files.len(), 2);
        assert!(out.join("users_both.json").exists());
        assert!(out.join("events_both.csv").exists());
    }

    #[tokio::test]
    async fn test_offline_store_fails_export() {
        let dir = tempfile::tempdir().unwrap();
        let kv = MemoryStore::new();
        kv.set_offline(true);
        let store = Store::new(kv);

        let result = Exporter::new(&store).export_json(dir.path(), "x").await;
        assert!(matches!(result, Err(CoreError::StorageUnavailable(_))));
    }
}
