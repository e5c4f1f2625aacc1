//! Key-value store abstraction.
//!
//! The storage layer only needs a handful of operations: whole field
//! mappings at a key, plain string values, and unordered sets of members.
//! `RedisStore` is the real backend; `MemoryStore` keeps everything in
//! process and backs the tests.

mod memory;
mod redis_store;

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::CoreResult;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

#[async_trait]
pub trait KvStore: Send + Sync {
    /// Human-readable address used in error messages.
    fn address(&self) -> String;

    async fn ping(&self) -> CoreResult<()>;

    /// Replace the whole field mapping at `key`. Fields not in `fields` are dropped.
    async fn replace_hash(&self, key: &str, fields: &[(&str, String)]) -> CoreResult<()>;

    /// All fields at `key`; empty if the key does not exist.
    async fn hash_fields(&self, key: &str) -> CoreResult<HashMap<String, String>>;

    async fn set_string(&self, key: &str, value: &str) -> CoreResult<()>;

    async fn get_string(&self, key: &str) -> CoreResult<Option<String>>;

    async fn add_member(&self, key: &str, member: &str) -> CoreResult<()>;

    /// Set members in no particular order; empty if the key does not exist.
    async fn members(&self, key: &str) -> CoreResult<HashSet<String>>;

    async fn cardinality(&self, key: &str) -> CoreResult<u64>;

    /// Keys matching a glob pattern. Only a trailing `*` wildcard is used.
    async fn keys_matching(&self, pattern: &str) -> CoreResult<Vec<String>>;

    /// Memory used by the backend, human-readable. `None` if it does not say.
    async fn memory_usage(&self) -> CoreResult<Option<String>>;

    /// Delete keys, returning how many existed.
    async fn delete(&self, keys: &[String]) -> CoreResult<u64>;
}
