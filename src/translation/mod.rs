//! Translation with a shared cache
//!
//! - [`cache_key`]: weak text hash, key layout and cached entry format
//! - [`cache`]: backend trait, in-memory backend and the lookup/store policy
//! - [`redis_backend`]: Redis implementation of the backend
//! - [`provider`]: DeepL compatible upstream API
//! - [`service`]: the entry point used by the HTTP handlers

pub mod cache;
pub mod cache_key;
pub mod provider;
pub mod redis_backend;
pub mod service;

pub use cache::{CacheBackend, LanguagePairUsage, MemoryCacheBackend, TranslationCache};
pub use cache_key::{CachedTranslation, weak_hash};
pub use provider::{DeepLProvider, ProviderUsage, TranslationProvider};
pub use redis_backend::RedisCacheBackend;
pub use service::{Translation, TranslationService, TranslationStats, TranslationUsage};
