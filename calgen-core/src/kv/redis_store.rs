//! Redis backend.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

use super::KvStore;
use crate::config::RedisSettings;
use crate::error::{CoreError, CoreResult};

/// A `KvStore` on a Redis server, over one multiplexed connection.
///
/// Every Redis error surfaces as `StorageUnavailable` carrying the server
/// address; nothing here retries.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    address: String,
}

impl RedisStore {
    /// Connect and ping, so an unreachable server fails here rather than mid-run.
    pub async fn connect(settings: &RedisSettings) -> CoreResult<Self> {
        let address = format!("{}:{}/{}", settings.host, settings.port, settings.db);
        let unavailable =
            |e: redis::RedisError| CoreError::StorageUnavailable(format!("{}: {}", address, e));

        let info = redis::ConnectionInfo {
            addr: redis::ConnectionAddr::Tcp(settings.host.clone(), settings.port),
            redis: redis::RedisConnectionInfo {
                db: settings.db,
                password: settings.password.clone(),
                ..Default::default()
            },
        };

        let client = redis::Client::open(info).map_err(unavailable)?;
        let conn = client
            .get_multiplexed_async_connection()
            .await
            .map_err(unavailable)?;

        let store = RedisStore { conn, address };
        store.ping().await?;
        tracing::debug!(address = %store.address, "connected to redis");

        Ok(store)
    }

    fn unavailable(&self, e: redis::RedisError) -> CoreError {
        CoreError::StorageUnavailable(format!("{}: {}", self.address, e))
    }
}

#[async_trait]
impl KvStore for RedisStore {
    fn address(&self) -> String {
        format!("redis://{}", self.address)
    }

    async fn ping(&self) -> CoreResult<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    async fn replace_hash(&self, key: &str, fields: &[(&str, String)]) -> CoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = redis::pipe()
            .atomic()
            .del(key)
            .ignore()
            .hset_multiple(key, fields)
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    async fn hash_fields(&self, key: &str) -> CoreResult<HashMap<String, String>> {
        let mut conn = self.conn.clone();
        conn.hgetall(key).await.map_err(|e| self.unavailable(e))
    }

    async fn set_string(&self, key: &str, value: &str) -> CoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(key, value).await.map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    async fn get_string(&self, key: &str) -> CoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(|e| self.unavailable(e))
    }

    async fn add_member(&self, key: &str, member: &str) -> CoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.sadd(key, member).await.map_err(|e| self.unavailable(e))?;
        Ok(())
    }

    async fn members(&self, key: &str) -> CoreResult<HashSet<String>> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(|e| self.unavailable(e))
    }

    async fn cardinality(&self, key: &str) -> CoreResult<u64> {
        let mut conn = self.conn.clone();
        conn.scard(key).await.map_err(|e| self.unavailable(e))
    }

    async fn keys_matching(&self, pattern: &str) -> CoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut iter: redis::AsyncIter<String> = conn
            .scan_match(pattern)
            .await
            .map_err(|e| self.unavailable(e))?;

        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }

    async fn memory_usage(&self) -> CoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        let info: String = redis::cmd("INFO")
            .arg("memory")
            .query_async(&mut conn)
            .await
            .map_err(|e| self.unavailable(e))?;
        Ok(used_memory_human(&info))
    }

    async fn delete(&self, keys: &[String]) -> CoreResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.clone();
        conn.del(keys).await.map_err(|e| self.unavailable(e))
    }
}

/// The `used_memory_human` value from an `INFO memory` reply.
fn used_memory_human(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.trim().strip_prefix("used_memory_human:"))
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_used_memory_human_from_info_reply() {
        let info = "# Memory\r\nused_memory:1048576\r\nused_memory_human:1.00M\r\nused_memory_rss:2000000\r\n";
        assert_eq!(used_memory_human(info).as_deref(), Some("1.00M"));
        assert_eq!(used_memory_human("# Memory\r\n"), None);
    }
}
