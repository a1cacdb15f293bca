//! Short-lived cache of GET responses
//!
//! Entries expire after a fixed TTL and the least recently used entry is
//! evicted once the capacity is reached. Mutations invalidate by path prefix.
//!
//! Every invalidation bumps a generation. A response fetched before an
//! invalidation is stored with [`ResponseCache::insert_if_current`] and is
//! dropped instead of overwriting the invalidated state.

use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

const DEFAULT_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(capacity) => capacity,
    None => NonZeroUsize::MIN,
};

struct CachedResponse {
    body: Value,
    stored_at: Instant,
}

struct Entries {
    responses: LruCache<String, CachedResponse>,
    generation: u64,
}

#[derive(Clone)]
pub struct ResponseCache {
    entries: Arc<Mutex<Entries>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(DEFAULT_CAPACITY);
        Self {
            entries: Arc::new(Mutex::new(Entries {
                responses: LruCache::new(capacity),
                generation: 0,
            })),
            ttl,
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        let expired = match entries.responses.get(key) {
            Some(entry) if entry.stored_at.elapsed() < self.ttl => {
                trace!(key, "Response cache hit");
                return Some(entry.body.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.responses.pop(key);
        }
        None
    }

    pub fn insert(&self, key: &str, body: Value) {
        Self::put(&mut self.lock(), key, body);
    }

    /// Current invalidation generation; read it before starting a request
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Store `body` unless the cache was invalidated since `generation`.
    /// Returns whether it was stored.
    pub fn insert_if_current(&self, key: &str, body: Value, generation: u64) -> bool {
        let mut entries = self.lock();
        if entries.generation != generation {
            trace!(key, "Discarding response fetched before invalidation");
            return false;
        }
        Self::put(&mut entries, key, body);
        true
    }

    fn put(entries: &mut Entries, key: &str, body: Value) {
        entries.responses.put(
            key.to_string(),
            CachedResponse {
                body,
                stored_at: Instant::now(),
            },
        );
    }

    /// Drop every entry whose key starts with `prefix`; returns how many
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.lock();
        entries.generation += 1;
        let keys: Vec<String> = entries
            .responses
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &keys {
            entries.responses.pop(key);
        }
        keys.len()
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.generation += 1;
        entries.responses.clear();
    }

    pub fn len(&self) -> usize {
        self.lock().responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
