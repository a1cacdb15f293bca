//! Redis cache backend
//!
//! One multiplexed async connection is shared by all calls and re-opened
//! after a connection failure. Keys are written with `SETEX` so Redis
//! expires them on its own; prefix listing walks the keyspace with `SCAN`.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, RedisError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::{TranslationError, TranslationResult};
use crate::translation::cache::CacheBackend;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(2);
const SCAN_BATCH: usize = 500;

#[derive(Clone)]
pub struct RedisCacheBackend {
    client: redis::Client,
    connection: Arc<Mutex<Option<MultiplexedConnection>>>,
}

impl RedisCacheBackend {
    pub fn new(url: &str) -> TranslationResult<Self> {
        let client = redis::Client::open(url)?;
        Ok(Self {
            client,
            connection: Arc::new(Mutex::new(None)),
        })
    }

    /// Verify the server is reachable
    pub async fn ping(&self) -> TranslationResult<()> {
        let mut conn = self.connection().await?;
        let pong: Result<String, RedisError> = redis::cmd("PING").query_async(&mut conn).await;
        self.checked(pong).await?;
        Ok(())
    }

    async fn connection(&self) -> TranslationResult<MultiplexedConnection> {
        let mut cached = self.connection.lock().await;
        if let Some(conn) = cached.as_ref() {
            return Ok(conn.clone());
        }

        let conn = timeout(CONNECT_TIMEOUT, self.client.get_multiplexed_async_connection())
            .await
            .map_err(|_| TranslationError::Cache("Timed out connecting to Redis".to_string()))?
            .map_err(TranslationError::from)?;
        debug!("Opened Redis connection");
        *cached = Some(conn.clone());
        Ok(conn)
    }

    /// Drop the shared connection when a command failed because of it
    async fn checked<T>(&self, result: Result<T, RedisError>) -> TranslationResult<T> {
        match result {
            Ok(value) => Ok(value),
            Err(e) => {
                if is_connection_error(&e) {
                    warn!("Redis connection lost, reconnecting on next call: {}", e);
                    *self.connection.lock().await = None;
                }
                Err(e.into())
            }
        }
    }
}

fn is_connection_error(e: &RedisError) -> bool {
    e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout()
}

/// `SCAN MATCH` pattern for keys starting with `prefix`, glob characters escaped
fn scan_pattern(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('*');
    pattern
}

#[async_trait]
impl CacheBackend for RedisCacheBackend {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        let mut conn = self.connection().await?;
        let value = conn.get(key).await;
        self.checked(value).await
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TranslationResult<()> {
        let mut conn = self.connection().await?;
        let seconds = ttl.as_secs().max(1);
        let result: Result<(), RedisError> = conn.set_ex(key, value, seconds).await;
        self.checked(result).await
    }

    async fn incr_by(&self, key: &str, amount: i64) -> TranslationResult<i64> {
        let mut conn = self.connection().await?;
        let value = conn.incr(key, amount).await;
        self.checked(value).await
    }

    async fn keys(&self, prefix: &str) -> TranslationResult<Vec<String>> {
        let mut conn = self.connection().await?;
        let pattern = scan_pattern(prefix);
        let mut keys = Vec::new();
        let mut cursor: u64 = 0;

        loop {
            let page: Result<(u64, Vec<String>), RedisError> = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await;
            let (next, batch) = self.checked(page).await?;
            keys.extend(batch);
            if next == 0 {
                break;
            }
            cursor = next;
        }

        // SCAN may return a key more than once
        keys.sort_unstable();
        keys.dedup();
        debug!("Found {} Redis key(s) under '{}'", keys.len(), prefix);
        Ok(keys)
    }

    async fn delete(&self, keys: &[String]) -> TranslationResult<u64> {
        if keys.is_empty() {
            return Ok(0);
        }
        let mut conn = self.connection().await?;
        let removed = conn.del(keys).await;
        self.checked(removed).await
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
