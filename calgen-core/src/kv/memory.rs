//! In-process key-value store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::KvStore;
use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone)]
enum Entry {
    Hash(HashMap<String, String>),
    Set(HashSet<String>),
    Text(String),
}

/// A `KvStore` held in memory.
///
/// It can be switched offline, after which every operation fails with
/// `StorageUnavailable` like an unreachable server would.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Entry>>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of keys currently held.
    pub fn len(&self) -> CoreResult<usize> {
        self.with_entries(|entries| Ok(entries.len()))
    }

    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Run `f` against the entries, failing when offline.
    fn with_entries<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> CoreResult<T>) -> CoreResult<T> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(CoreError::StorageUnavailable(format!(
                "{} is offline",
                self.address()
            )));
        }

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| CoreError::StorageUnavailable("memory store lock poisoned".into()))?;
        f(&mut entries)
    }
}

fn wrong_type(key: &str) -> CoreError {
    CoreError::StorageUnavailable(format!(
        "WRONGTYPE operation against key '{}' holding the wrong kind of value",
        key
    ))
}

/// Rough byte count of keys and values.
fn approximate_size(entries: &HashMap<String, Entry>) -> u64 {
    entries
        .iter()
        .map(|(key, entry)| {
            let value = match entry {
                Entry::Hash(hash) => hash.iter().map(|(f, v)| f.len() + v.len()).sum(),
                Entry::Set(set) => set.iter().map(String::len).sum(),
                Entry::Text(text) => text.len(),
            };
            (key.len() + value) as u64
        })
        .sum()
}

/// Bytes in the style of Redis' `used_memory_human`: `512B`, `1.50K`, `2.00M`.
pub(crate) fn human_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["K", "M", "G", "T"];

    if bytes < 1024 {
        return format!("{}B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2}{}", value, UNITS[unit])
}

fn matches_pattern(key: &str, pattern: &str) -> bool {
    match pattern.strip_suffix('*') {
        Some(prefix) => key.starts_with(prefix),
        None => key == pattern,
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn address(&self) -> String {
        "memory".to_string()
    }

    async fn ping(&self) -> CoreResult<()> {
        self.with_entries(|_| Ok(()))
    }

    async fn replace_hash(&self, key: &str, fields: &[(&str, String)]) -> CoreResult<()> {
        self.with_entries(|entries| {
            let hash = fields
                .iter()
                .map(|(field, value)| (field.to_string(), value.clone()))
                .collect();
            entries.insert(key.to_string(), Entry::Hash(hash));
            Ok(())
        })
    }

    async fn hash_fields(&self, key: &str) -> CoreResult<HashMap<String, String>> {
        self.with_entries(|entries| match entries.get(key) {
            Some(Entry::Hash(hash)) => Ok(hash.clone()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(HashMap::new()),
        })
    }

    async fn set_string(&self, key: &str, value: &str) -> CoreResult<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), Entry::Text(value.to_string()));
            Ok(())
        })
    }

    async fn get_string(&self, key: &str) -> CoreResult<Option<String>> {
        self.with_entries(|entries| match entries.get(key) {
            Some(Entry::Text(value)) => Ok(Some(value.clone())),
            Some(_) => Err(wrong_type(key)),
            None => Ok(None),
        })
    }

    async fn add_member(&self, key: &str, member: &str) -> CoreResult<()> {
        self.with_entries(|entries| {
            let entry = entries
                .entry(key.to_string())
                .or_insert_with(|| Entry::Set(HashSet::new()));
            match entry {
                Entry::Set(set) => {
                    set.insert(member.to_string());
                    Ok(())
                }
                _ => Err(wrong_type(key)),
            }
        })
    }

    async fn members(&self, key: &str) -> CoreResult<HashSet<String>> {
        self.with_entries(|entries| match entries.get(key) {
            Some(Entry::Set(set)) => Ok(set.clone()),
            Some(_) => Err(wrong_type(key)),
            None => Ok(HashSet::new()),
        })
    }

    async fn cardinality(&self, key: &str) -> CoreResult<u64> {
        self.with_entries(|entries| match entries.get(key) {
            Some(Entry::Set(set)) => Ok(set.len() as u64),
            Some(_) => Err(wrong_type(key)),
            None => Ok(0),
        })
    }

    async fn keys_matching(&self, pattern: &str) -> CoreResult<Vec<String>> {
        self.with_entries(|entries| {
            Ok(entries
                .keys()
                .filter(|key| matches_pattern(key, pattern))
                .cloned()
                .collect())
        })
    }

    async fn delete(&self, keys: &[String]) -> CoreResult<u64> {
        self.with_entries(|entries| {
            Ok(keys.iter().filter(|key| entries.remove(*key).is_some()).count() as u64)
        })
    }

    async fn memory_usage(&self) -> CoreResult<Option<String>> {
        self.with_entries(|entries| Ok(Some(human_bytes(approximate_size(entries)))))
    }
}
