use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, RedisError};
use std::time::Duration;

const SCAN_BATCH: usize = 200;

/// Redis-backed session store. Expiry is delegated to Redis (`PX`), so
/// entries vanish without application code.
pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    pub async fn connect(dsn: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        let client = redis::Client::open(dsn)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self::new(conn, prefix))
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{}", self.prefix, key)
    }

    fn strip<'a>(&self, full: &'a str) -> &'a str {
        full.strip_prefix(&self.prefix)
            .and_then(|rest| rest.strip_prefix(':'))
            .unwrap_or(full)
    }

    fn escape_glob(raw: &str) -> String {
        let mut out = String::with_capacity(raw.len());
        for c in raw.chars() {
            if matches!(c, '*' | '?' | '[' | ']' | '\\') {
                out.push('\\');
            }
            out.push(c);
        }
        out
    }
}

fn unavailable(e: RedisError) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn ttl_millis(ttl: Duration) -> u64 {
    // PX rejects 0; anything below a millisecond rounds up
    (ttl.as_millis() as u64).max(1)
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        if ttl.is_zero() {
            let _: i64 = conn.del(&key).await.map_err(unavailable)?;
            return Ok(());
        }
        let _: () = conn
            .pset_ex(&key, value, ttl_millis(ttl))
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        if ttl.is_zero() {
            return Ok(false);
        }
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(value)
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(reply.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(&key).await.map_err(unavailable)?;
        Ok(value)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let found: bool = conn.exists(&key).await.map_err(unavailable)?;
        Ok(found)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let key = self.key(key);
        let mut conn = self.conn.clone();
        let removed: i64 = conn.del(&key).await.map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn scan_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, StoreError> {
        let pattern = format!("{}*", Self::escape_glob(&self.key(prefix)));
        let mut conn = self.conn.clone();

        let mut keys: Vec<String> = Vec::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .cursor_arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(unavailable)?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }
        keys.sort();
        keys.dedup();
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let values: Vec<Option<String>> = redis::cmd("MGET")
            .arg(&keys)
            .query_async(&mut conn)
            .await
            .map_err(unavailable)?;

        // keys may expire between SCAN and MGET
        Ok(keys
            .iter()
            .zip(values)
            .filter_map(|(full, value)| value.map(|v| (self.strip(full).to_string(), v)))
            .collect())
    }
}
