//! Translation cache over a pluggable key/value backend
//!
//! Lookups try the individual key first and then the grouped blob for the
//! language pair. Writes follow the configured [`CacheMode`].
//!
//! A grouped blob is rewritten whole on every store, so stores for the same
//! language pair are serialised within the process. Several processes
//! sharing one Redis can still overwrite each other's grouped entries; the
//! lost entries only cost a later upstream call.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use crate::config::{CacheMode, TranslationConfig};
use crate::errors::{TranslationError, TranslationResult};
use crate::translation::cache_key::{
    CachedTranslation, GroupedCache, group_key, individual_key, parse_usage_key, usage_key,
    weak_hash,
};

/// Minimal key/value operations the translation cache needs
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>>;

    /// Set `key` with an expiry
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TranslationResult<()>;

    /// Add `amount` to an integer counter, creating it at zero
    async fn incr_by(&self, key: &str, amount: i64) -> TranslationResult<i64>;

    /// All live keys starting with `prefix`
    async fn keys(&self, prefix: &str) -> TranslationResult<Vec<String>>;

    async fn delete(&self, keys: &[String]) -> TranslationResult<u64>;

    fn name(&self) -> &'static str;
}

struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-process backend used when Redis is not configured
#[derive(Default)]
pub struct MemoryCacheBackend {
    entries: RwLock<HashMap<String, MemoryEntry>>,
}

impl MemoryCacheBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheBackend for MemoryCacheBackend {
    async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(Instant::now()))
            .map(|entry| entry.value.clone()))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TranslationResult<()> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(now + ttl),
            },
        );
        Ok(())
    }

    async fn incr_by(&self, key: &str, amount: i64) -> TranslationResult<i64> {
        let mut entries = self.entries.write().await;
        let entry = entries.entry(key.to_string()).or_insert(MemoryEntry {
            value: "0".to_string(),
            expires_at: None,
        });
        let current: i64 = entry
            .value
            .parse()
            .map_err(|_| TranslationError::Cache(format!("Value at '{}' is not an integer", key)))?;
        let updated = current + amount;
        entry.value = updated.to_string();
        Ok(updated)
    }

    async fn keys(&self, prefix: &str) -> TranslationResult<Vec<String>> {
        let now = Instant::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && entry.is_live(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn delete(&self, keys: &[String]) -> TranslationResult<u64> {
        let mut entries = self.entries.write().await;
        Ok(keys.iter().filter(|key| entries.remove(*key).is_some()).count() as u64)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Characters translated for one language pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePairUsage {
    pub source_lang: String,
    pub target_lang: String,
    pub characters: i64,
}

#[derive(Clone)]
pub struct TranslationCache {
    backend: Arc<dyn CacheBackend>,
    prefix: String,
    mode: CacheMode,
    individual_ttl: Duration,
    grouped_ttl: Duration,
    record_usage: bool,
    group_locks: Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl TranslationCache {
    pub fn from_config(backend: Arc<dyn CacheBackend>, config: &TranslationConfig) -> Self {
        Self {
            backend,
            prefix: config.key_prefix.clone(),
            mode: config.cache_mode,
            individual_ttl: config.individual_ttl,
            grouped_ttl: config.grouped_ttl,
            record_usage: config.record_usage,
            group_locks: Arc::default(),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Cached translation for `text`, if any live entry exists
    pub async fn lookup(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> TranslationResult<Option<CachedTranslation>> {
        let now_ms = Utc::now().timestamp_millis();

        let key = individual_key(&self.prefix, source, target, text);
        if let Some(raw) = self.backend.get(&key).await? {
            match serde_json::from_str::<CachedTranslation>(&raw) {
                Ok(entry) if entry.matches(text, now_ms) => {
                    trace!(key = %key, "Individual cache hit");
                    return Ok(Some(entry));
                }
                Ok(_) => trace!(key = %key, "Individual entry expired or collided"),
                Err(e) => debug!(key = %key, "Ignoring unreadable cache entry: {}", e),
            }
        }

        let group = self.load_group(source, target).await?;
        if let Some(entry) = group.get(&weak_hash(text)) {
            if entry.matches(text, now_ms) {
                trace!(source, target, "Grouped cache hit");
                return Ok(Some(entry.clone()));
            }
        }

        Ok(None)
    }

    /// Write a translation under every policy the cache mode enables
    pub async fn store(
        &self,
        text: &str,
        source: &str,
        target: &str,
        translated: &str,
    ) -> TranslationResult<()> {
        let now_ms = Utc::now().timestamp_millis();

        if self.mode.writes_individual() {
            let entry = self.entry(text, source, target, translated, now_ms, self.individual_ttl);
            let key = individual_key(&self.prefix, source, target, text);
            self.backend
                .set_ex(&key, &Self::encode(&entry)?, self.individual_ttl)
                .await?;
        }

        if self.mode.writes_grouped() {
            let group_lock = self.group_lock(source, target);
            let _guard = group_lock.lock().await;
            let mut group = self.load_group(source, target).await?;
            group.retain(|_, entry| !entry.is_expired(now_ms));
            group.insert(
                weak_hash(text),
                self.entry(text, source, target, translated, now_ms, self.grouped_ttl),
            );
            let encoded = serde_json::to_string(&group)
                .map_err(|e| TranslationError::Cache(e.to_string()))?;
            self.backend
                .set_ex(&group_key(&self.prefix, source, target), &encoded, self.grouped_ttl)
                .await?;
        }

        Ok(())
    }

    /// Add to the characters-translated counter of a language pair
    pub async fn record_usage(
        &self,
        source: &str,
        target: &str,
        characters: usize,
    ) -> TranslationResult<()> {
        if !self.record_usage || characters == 0 {
            return Ok(());
        }
        self.backend
            .incr_by(&usage_key(&self.prefix, source, target), characters as i64)
            .await?;
        Ok(())
    }

    pub async fn usage_by_pair(&self) -> TranslationResult<Vec<LanguagePairUsage>> {
        let usage_prefix = format!("{}:usage:", self.prefix);
        let mut usage = Vec::new();
        for key in self.backend.keys(&usage_prefix).await? {
            let Some((source, target)) = parse_usage_key(&self.prefix, &key) else {
                continue;
            };
            let characters = match self.backend.get(&key).await? {
                Some(raw) => raw.parse().unwrap_or_else(|_| {
                    warn!(key = %key, "Usage counter is not an integer");
                    0
                }),
                None => continue,
            };
            usage.push(LanguagePairUsage {
                source_lang: source.to_string(),
                target_lang: target.to_string(),
                characters,
            });
        }
        usage.sort_by(|a, b| {
            (a.source_lang.as_str(), a.target_lang.as_str())
                .cmp(&(b.source_lang.as_str(), b.target_lang.as_str()))
        });
        Ok(usage)
    }

    /// Remove every cached translation; usage counters are kept
    pub async fn clear(&self) -> TranslationResult<u64> {
        let usage_prefix = format!("{}:usage:", self.prefix);
        let keys: Vec<String> = self
            .backend
            .keys(&format!("{}:", self.prefix))
            .await?
            .into_iter()
            .filter(|key| !key.starts_with(&usage_prefix))
            .collect();
        if keys.is_empty() {
            return Ok(0);
        }
        let removed = self.backend.delete(&keys).await?;
        debug!("Cleared {} translation cache key(s)", removed);
        Ok(removed)
    }

    fn group_lock(&self, source: &str, target: &str) -> Arc<Mutex<()>> {
        let mut locks = self
            .group_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(group_key(&self.prefix, source, target))
            .or_default()
            .clone()
    }

    async fn load_group(&self, source: &str, target: &str) -> TranslationResult<GroupedCache> {
        let key = group_key(&self.prefix, source, target);
        match self.backend.get(&key).await? {
            Some(raw) => Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
                debug!(key = %key, "Ignoring unreadable grouped cache: {}", e);
                GroupedCache::new()
            })),
            None => Ok(GroupedCache::new()),
        }
    }

    fn entry(
        &self,
        text: &str,
        source: &str,
        target: &str,
        translated: &str,
        now_ms: i64,
        ttl: Duration,
    ) -> CachedTranslation {
        CachedTranslation {
            source_text: text.to_string(),
            source_lang: source.to_string(),
            target_lang: target.to_string(),
            translated_text: translated.to_string(),
            timestamp: now_ms,
            expires_at: now_ms.saturating_add(ttl.as_millis() as i64),
        }
    }

    fn encode(entry: &CachedTranslation) -> TranslationResult<String> {
        serde_json::to_string(entry).map_err(|e| TranslationError::Cache(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn cache_with_mode(mode: CacheMode) -> (Arc<MemoryCacheBackend>, TranslationCache) {
        let backend = Arc::new(MemoryCacheBackend::new());
        let config = TranslationConfig {
            cache_mode: mode,
            ..TranslationConfig::default()
        };
        let cache = TranslationCache::from_config(backend.clone(), &config);
        (backend, cache)
    }

    #[rstest]
    #[case(CacheMode::Individual, true, false)]
    #[case(CacheMode::Grouped, false, true)]
    #[case(CacheMode::Both, true, true)]
    #[tokio::test]
    async fn test_store_writes_configured_policies(
        #[case] mode: CacheMode,
        #[case] individual: bool,
        #[case] grouped: bool,
    ) {
        let (backend, cache) = cache_with_mode(mode);
        cache.store("hello", "en", "de", "hallo").await.unwrap();

        let individual_entry = backend
            .get("translation:en:de:1n1e4y")
            .await
            .unwrap();
        let group_entry = backend.get("translation:group:en:de").await.unwrap();
        assert_eq!(individual_entry.is_some(), individual);
        assert_eq!(group_entry.is_some(), grouped);

        let hit = cache.lookup("hello", "en", "de").await.unwrap().unwrap();
        assert_eq!(hit.translated_text, "hallo");
        assert!(cache.lookup("hello", "en", "fr").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss() {
        let (backend, cache) = cache_with_mode(CacheMode::Individual);
        let stale = CachedTranslation {
            source_text: "hello".to_string(),
            source_lang: "en".to_string(),
            target_lang: "de".to_string(),
            translated_text: "hallo".to_string(),
            timestamp: 0,
            expires_at: Utc::now().timestamp_millis() - 1,
        };
        backend
            .set_ex(
                "translation:en:de:1n1e4y",
                &serde_json::to_string(&stale).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        assert!(cache.lookup("hello", "en", "de").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_grouped_blob_keeps_all_texts_of_a_pair() {
        let (_, cache) = cache_with_mode(CacheMode::Grouped);
        cache.store("cat", "en", "de", "Katze").await.unwrap();
        cache.store("kitten", "en", "de", "Kätzchen").await.unwrap();

        let cat = cache.lookup("cat", "en", "de").await.unwrap().unwrap();
        let kitten = cache.lookup("kitten", "en", "de").await.unwrap().unwrap();
        assert_eq!(cat.translated_text, "Katze");
        assert_eq!(kitten.translated_text, "Kätzchen");
    }

    /// Memory backend whose reads yield, so concurrent stores interleave
    struct YieldingBackend(MemoryCacheBackend);

    #[async_trait]
    impl CacheBackend for YieldingBackend {
        async fn get(&self, key: &str) -> TranslationResult<Option<String>> {
            let value = self.0.get(key).await;
            tokio::time::sleep(Duration::from_millis(5)).await;
            value
        }

        async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> TranslationResult<()> {
            self.0.set_ex(key, value, ttl).await
        }

        async fn incr_by(&self, key: &str, amount: i64) -> TranslationResult<i64> {
            self.0.incr_by(key, amount).await
        }

        async fn keys(&self, prefix: &str) -> TranslationResult<Vec<String>> {
            self.0.keys(prefix).await
        }

        async fn delete(&self, keys: &[String]) -> TranslationResult<u64> {
            self.0.delete(keys).await
        }

        fn name(&self) -> &'static str {
            "yielding"
        }
    }

    #[tokio::test]
    async fn test_concurrent_grouped_stores_keep_every_entry() {
        let config = TranslationConfig {
            cache_mode: CacheMode::Grouped,
            ..TranslationConfig::default()
        };
        let cache = TranslationCache::from_config(
            Arc::new(YieldingBackend(MemoryCacheBackend::new())),
            &config,
        );
        let texts: Vec<String> = (0..8).map(|n| format!("text {n}")).collect();

        futures::future::try_join_all(
            texts
                .iter()
                .map(|text| cache.store(text, "en", "de", text)),
        )
        .await
        .unwrap();

        for text in &texts {
            let hit = cache.lookup(text, "en", "de").await.unwrap();
            assert_eq!(hit.map(|e| e.translated_text).as_ref(), Some(text));
        }
    }

    #[tokio::test]
    async fn test_clear_keeps_usage_counters() {
        let (_, cache) = cache_with_mode(CacheMode::Both);
        cache.store("hello", "en", "de", "hallo").await.unwrap();
        cache.record_usage("en", "de", 5).await.unwrap();
        cache.record_usage("en", "de", 3).await.unwrap();

        assert_eq!(cache.clear().await.unwrap(), 2);
        assert!(cache.lookup("hello", "en", "de").await.unwrap().is_none());

        let usage = cache.usage_by_pair().await.unwrap();
        assert_eq!(
            usage,
            vec![LanguagePairUsage {
                source_lang: "en".to_string(),
                target_lang: "de".to_string(),
                characters: 8,
            }]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_memory_backend_expires_keys() {
        let backend = MemoryCacheBackend::new();
        backend
            .set_ex("k", "v", Duration::from_secs(30))
            .await
            .unwrap();
        assert_eq!(backend.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(backend.get("k").await.unwrap().is_none());
        assert!(backend.keys("").await.unwrap().is_empty());
    }
}
