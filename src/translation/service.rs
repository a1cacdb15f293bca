//! Cached, deduplicated translation
//!
//! A request is answered from the cache when possible. Misses go upstream
//! through the request deduplicator so concurrent identical requests share
//! one provider call. Cache failures never fail a translation; they only
//! cost an extra upstream call.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

use crate::errors::{TranslationError, TranslationResult};
use crate::translation::cache::{LanguagePairUsage, TranslationCache};
use crate::translation::provider::{ProviderUsage, TranslationProvider};
use crate::utils::RequestDeduplicator;

/// A translated text and where it came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    pub text: String,
    pub cached: bool,
}

impl Translation {
    fn passthrough(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cached: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationStats {
    pub hits: u64,
    pub misses: u64,
    pub upstream_calls: u64,
    pub errors: u64,
    pub cache_errors: u64,
    pub in_flight: usize,
    pub cache_backend: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationUsage {
    /// Provider quota, absent when no provider is configured
    pub provider: Option<ProviderUsage>,
    pub by_language_pair: Vec<LanguagePairUsage>,
}

#[derive(Default)]
struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    upstream_calls: AtomicU64,
    errors: AtomicU64,
    cache_errors: AtomicU64,
}

#[derive(Clone)]
pub struct TranslationService {
    cache: TranslationCache,
    provider: Option<Arc<dyn TranslationProvider>>,
    dedup: RequestDeduplicator<TranslationResult<String>>,
    counters: Arc<Counters>,
}

impl TranslationService {
    pub fn new(cache: TranslationCache, provider: Option<Arc<dyn TranslationProvider>>) -> Self {
        Self {
            cache,
            provider,
            dedup: RequestDeduplicator::new(),
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    pub async fn translate(
        &self,
        text: &str,
        source: &str,
        target: &str,
    ) -> TranslationResult<Translation> {
        if Self::is_passthrough(text, source, target) {
            return Ok(Translation::passthrough(text));
        }

        if let Some(hit) = self.cached(text, source, target).await {
            return Ok(hit);
        }

        let provider = self.provider()?;
        let key = format!("{}\u{1f}{}\u{1f}{}", source, target, text);
        let cache = self.cache.clone();
        let counters = self.counters.clone();
        let (text, source, target) = (text.to_string(), source.to_string(), target.to_string());

        let translated = self
            .dedup
            .execute(&key, move || async move {
                counters.upstream_calls.fetch_add(1, Ordering::Relaxed);
                let translated = provider
                    .translate(std::slice::from_ref(&text), &source, &target)
                    .await
                    .and_then(|mut texts| {
                        texts.pop().ok_or_else(|| {
                            TranslationError::InvalidResponse("Empty translation list".to_string())
                        })
                    });

                match &translated {
                    Ok(result) => {
                        store_quietly(&cache, &counters, &text, &source, &target, result).await;
                        record_usage_quietly(&cache, &counters, &source, &target, text.chars().count())
                            .await;
                    }
                    Err(e) => {
                        counters.errors.fetch_add(1, Ordering::Relaxed);
                        warn!(source = %source, target = %target, "Translation failed: {}", e);
                    }
                }
                translated
            })
            .await?;

        Ok(Translation {
            text: translated,
            cached: false,
        })
    }

    /// Translate several texts with at most one upstream call; order is preserved
    pub async fn translate_batch(
        &self,
        texts: &[String],
        source: &str,
        target: &str,
    ) -> TranslationResult<Vec<Translation>> {
        let mut results: Vec<Option<Translation>> = Vec::with_capacity(texts.len());
        let mut misses: Vec<String> = Vec::new();

        for text in texts {
            if Self::is_passthrough(text, source, target) {
                results.push(Some(Translation::passthrough(text)));
            } else if let Some(hit) = self.cached(text, source, target).await {
                results.push(Some(hit));
            } else {
                if !misses.contains(text) {
                    misses.push(text.clone());
                }
                results.push(None);
            }
        }

        if !misses.is_empty() {
            let provider = self.provider()?;
            self.counters.upstream_calls.fetch_add(1, Ordering::Relaxed);
            let translated = match provider.translate(&misses, source, target).await {
                Ok(translated) => translated,
                Err(e) => {
                    self.counters.errors.fetch_add(1, Ordering::Relaxed);
                    warn!(count = misses.len(), "Batch translation failed: {}", e);
                    return Err(e);
                }
            };

            let mut fresh: HashMap<&str, &str> = HashMap::with_capacity(misses.len());
            for (original, result) in misses.iter().zip(translated.iter()) {
                store_quietly(&self.cache, &self.counters, original, source, target, result).await;
                fresh.insert(original.as_str(), result.as_str());
            }
            let characters = misses.iter().map(|t| t.chars().count()).sum();
            record_usage_quietly(&self.cache, &self.counters, source, target, characters).await;

            for (slot, text) in results.iter_mut().zip(texts) {
                if slot.is_none() {
                    let translated = fresh.get(text.as_str()).ok_or_else(|| {
                        TranslationError::InvalidResponse(format!(
                            "No translation returned for '{}'",
                            text
                        ))
                    })?;
                    *slot = Some(Translation {
                        text: translated.to_string(),
                        cached: false,
                    });
                }
            }
        }

        Ok(results.into_iter().flatten().collect())
    }

    pub fn stats(&self) -> TranslationStats {
        TranslationStats {
            hits: self.counters.hits.load(Ordering::Relaxed),
            misses: self.counters.misses.load(Ordering::Relaxed),
            upstream_calls: self.counters.upstream_calls.load(Ordering::Relaxed),
            errors: self.counters.errors.load(Ordering::Relaxed),
            cache_errors: self.counters.cache_errors.load(Ordering::Relaxed),
            in_flight: self.dedup.in_flight(),
            cache_backend: self.cache.backend_name().to_string(),
        }
    }

    /// Drop cached translations and forget in-flight requests
    pub async fn clear_cache(&self) -> TranslationResult<u64> {
        self.dedup.clear();
        let removed = self.cache.clear().await?;
        debug!("Translation cache cleared ({} keys)", removed);
        Ok(removed)
    }

    pub async fn usage(&self) -> TranslationResult<TranslationUsage> {
        let provider = match &self.provider {
            Some(provider) => Some(provider.usage().await?),
            None => None,
        };
        Ok(TranslationUsage {
            provider,
            by_language_pair: self.cache.usage_by_pair().await?,
        })
    }

    fn is_passthrough(text: &str, source: &str, target: &str) -> bool {
        text.trim().is_empty() || source.eq_ignore_ascii_case(target)
    }

    fn provider(&self) -> TranslationResult<Arc<dyn TranslationProvider>> {
        self.provider.clone().ok_or(TranslationError::NotConfigured)
    }

    /// Cache lookup that counts hits and misses and treats backend errors as misses
    async fn cached(&self, text: &str, source: &str, target: &str) -> Option<Translation> {
        match self.cache.lookup(text, source, target).await {
            Ok(Some(entry)) => {
                self.counters.hits.fetch_add(1, Ordering::Relaxed);
                Some(Translation {
                    text: entry.translated_text,
                    cached: true,
                })
            }
            Ok(None) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                self.counters.misses.fetch_add(1, Ordering::Relaxed);
                self.counters.cache_errors.fetch_add(1, Ordering::Relaxed);
                warn!("Translation cache lookup failed: {}", e);
                None
            }
        }
    }
}

async fn store_quietly(
    cache: &TranslationCache,
    counters: &Counters,
    text: &str,
    source: &str,
    target: &str,
    translated: &str,
) {
    if let Err(e) = cache.store(text, source, target, translated).await {
        counters.cache_errors.fetch_add(1, Ordering::Relaxed);
        warn!("Failed to cache translation: {}", e);
    }
}

async fn record_usage_quietly(
    cache: &TranslationCache,
    counters: &Counters,
    source: &str,
    target: &str,
    characters: usize,
) {
    if let Err(e) = cache.record_usage(source, target, characters).await {
        counters.cache_errors.fetch_add(1, Ordering::Relaxed);
        warn!("Failed to record translation usage: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranslationConfig;
    use crate::translation::cache::MemoryCacheBackend;
    use crate::translation::provider::MockTranslationProvider;

    fn service_with(provider: MockTranslationProvider) -> TranslationService {
        let cache = TranslationCache::from_config(
            Arc::new(MemoryCacheBackend::new()),
            &TranslationConfig::default(),
        );
        TranslationService::new(cache, Some(Arc::new(provider)))
    }

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let mut provider = MockTranslationProvider::new();
        provider
            .expect_translate()
            .times(1)
            .returning(|_, _, _| Ok(vec!["Hallo Welt".to_string()]));
        let service = service_with(provider);

        let first = service.translate("Hello world", "en", "de").await.unwrap();
        let second = service.translate("Hello world", "en", "de").await.unwrap();

        assert_eq!(first.text, "Hallo Welt");
        assert!(!first.cached);
        assert_eq!(second.text, "Hallo Welt");
        assert!(second.cached);

        let stats = service.stats();
        assert_eq!(stats.upstream_calls, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[tokio::test]
    async fn test_trivial_requests_skip_upstream() {
        let mut provider = MockTranslationProvider::new();
        provider.expect_translate().never();
        let service = service_with(provider);

        let blank = service.translate("   ", "en", "de").await.unwrap();
        assert_eq!(blank.text, "   ");
        let same = service.translate("Katze", "de", "DE").await.unwrap();
        assert_eq!(same.text, "Katze");
        assert_eq!(service.stats().upstream_calls, 0);
    }

    #[tokio::test]
    async fn test_batch_uses_one_call_for_all_misses() {
        let mut provider = MockTranslationProvider::new();
        provider
            .expect_translate()
            .times(1)
            .returning(|texts, _, _| Ok(texts.iter().map(|t| t.to_uppercase()).collect()));
        let service = service_with(provider);

        let texts = vec![
            "cat".to_string(),
            "".to_string(),
            "kitten".to_string(),
            "cat".to_string(),
        ];
        let results = service.translate_batch(&texts, "en", "de").await.unwrap();
        let rendered: Vec<&str> = results.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(rendered, vec!["CAT", "", "KITTEN", "CAT"]);

        // Now fully cached
        let again = service.translate_batch(&texts, "en", "de").await.unwrap();
        assert!(again[0].cached && again[2].cached);
    }

    #[tokio::test]
    async fn test_provider_errors_are_counted_and_returned() {
        let mut provider = MockTranslationProvider::new();
        provider
            .expect_translate()
            .times(2)
            .returning(|_, _, _| Err(TranslationError::RateLimited));
        let service = service_with(provider);

        let err = service.translate("hello", "en", "de").await.unwrap_err();
        assert!(matches!(err, TranslationError::RateLimited));
        // Failures are not cached
        assert!(service.translate("hello", "en", "de").await.is_err());
        assert_eq!(service.stats().errors, 2);
    }

    #[tokio::test]
    async fn test_unconfigured_provider() {
        let cache = TranslationCache::from_config(
            Arc::new(MemoryCacheBackend::new()),
            &TranslationConfig::default(),
        );
        let service = TranslationService::new(cache, None);
        assert!(!service.is_configured());
        let err = service.translate("hello", "en", "de").await.unwrap_err();
        assert!(matches!(err, TranslationError::NotConfigured));
        assert!(service.usage().await.unwrap().provider.is_none());
    }
}
