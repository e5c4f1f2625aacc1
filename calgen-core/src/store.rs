//! Record storage with secondary indexes.
//!
//! Key layout:
//!
//! | key                     | value          |
//! |-------------------------|----------------|
//! | `user:{user_id}`        | field mapping  |
//! | `event:{event_id}`      | field mapping  |
//! | `users`                 | set of ids     |
//! | `events`                | set of ids     |
//! | `user_events:{user_id}` | set of ids     |
//! | `email:{email}`         | user id        |
//!
//! Each write is independent; a crash between writes can leave a user
//! without its events, which is an accepted partial state.

use std::collections::HashSet;

use crate::constants::{EMAIL_KEY_PREFIX, EVENTS_INDEX, USER_EVENTS_KEY_PREFIX, USERS_INDEX};
use crate::error::CoreResult;
use crate::kv::KvStore;
use crate::record::{CalendarEvent, Record, User};

/// Key patterns removed by `clear_all`.
const CLEAR_PATTERNS: &[&str] = &["user:*", "event:*", "user_events:*", "email:*"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub users: u64,
    pub events: u64,
    /// Where the counts came from, e.g. `redis://localhost:6379/0`.
    pub address: String,
    /// Memory used by the backend as it reports it, e.g. `1.05M`.
    pub memory: Option<String>,
}

/// Owner of every stored record.
pub struct Store<K: KvStore> {
    kv: K,
}

fn user_events_key(user_id: &str) -> String {
    format!("{}{}", USER_EVENTS_KEY_PREFIX, user_id)
}

fn email_key(email: &str) -> String {
    format!("{}{}", EMAIL_KEY_PREFIX, email.to_lowercase())
}

impl<K: KvStore> Store<K> {
    pub fn new(kv: K) -> Self {
        Store { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }

    /// Write a user and index it. Overwrites an existing user with the same id.
    pub async fn put_user(&self, user: &User) -> CoreResult<()> {
        self.kv.replace_hash(&user.key(), &user.to_fields()?).await?;
        self.kv.add_member(USERS_INDEX, &user.user_id).await?;
        self.kv.set_string(&email_key(&user.email), &user.user_id).await?;
        Ok(())
    }

    /// Write an event and add it to the global and per-user indexes.
    ///
    /// The owning user is not required to exist.
    pub async fn put_event(&self, event: &CalendarEvent) -> CoreResult<()> {
        self.kv.replace_hash(&event.key(), &event.to_fields()?).await?;
        self.kv.add_member(EVENTS_INDEX, &event.event_id).await?;
        self.kv
            .add_member(&user_events_key(&event.user_id), &event.event_id)
            .await?;
        Ok(())
    }

    async fn get<R: Record>(&self, id: &str) -> CoreResult<Option<R>> {
        let key = R::key_for(id);
        let fields = self.kv.hash_fields(&key).await?;

        if fields.is_empty() {
            return Ok(None);
        }

        R::from_fields(&key, &fields).map(Some)
    }

    pub async fn get_user(&self, user_id: &str) -> CoreResult<Option<User>> {
        self.get(user_id).await
    }

    pub async fn get_event(&self, event_id: &str) -> CoreResult<Option<CalendarEvent>> {
        self.get(event_id).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        match self.kv.get_string(&email_key(email)).await? {
            Some(user_id) => self.get_user(&user_id).await,
            None => Ok(None),
        }
    }

    pub async fn list_user_ids(&self) -> CoreResult<HashSet<String>> {
        self.kv.members(USERS_INDEX).await
    }

    pub async fn list_event_ids(&self) -> CoreResult<HashSet<String>> {
        self.kv.members(EVENTS_INDEX).await
    }

    pub async fn list_events_for_user(&self, user_id: &str) -> CoreResult<HashSet<String>> {
        self.kv.members(&user_events_key(user_id)).await
    }

    /// Fetch records for `ids`, skipping ids whose record is gone, oldest first.
    async fn fetch_all<R: Record>(&self, ids: HashSet<String>) -> CoreResult<Vec<R>> {
        let mut records = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(record) = self.get::<R>(id).await? {
                records.push(record);
            }
        }

        records.sort_by(|a, b| {
            a.created_at()
                .cmp(&b.created_at())
                .then_with(|| a.id().cmp(b.id()))
        });
        Ok(records)
    }

    pub async fn all_users(&self) -> CoreResult<Vec<User>> {
        let ids = self.list_user_ids().await?;
        self.fetch_all(ids).await
    }

    pub async fn all_events(&self) -> CoreResult<Vec<CalendarEvent>> {
        let ids = self.list_event_ids().await?;
        self.fetch_all(ids).await
    }

    pub async fn stats(&self) -> CoreResult<StoreStats> {
        Ok(StoreStats {
            users: self.kv.cardinality(USERS_INDEX).await?,
            events: self.kv.cardinality(EVENTS_INDEX).await?,
            address: self.kv.address(),
            memory: self.kv.memory_usage().await?,
        })
    }

    /// Delete every record and every index. Returns the number of keys removed.
    pub async fn clear_all(&self) -> CoreResult<u64> {
        let mut keys = vec![USERS_INDEX.to_string(), EVENTS_INDEX.to_string()];
        for pattern in CLEAR_PATTERNS {
            keys.extend(self.kv.keys_matching(pattern).await?);
        }

        let deleted = self.kv.delete(&keys).await?;
        tracing::info!(deleted, "cleared store");
        Ok(deleted)
    }
}
