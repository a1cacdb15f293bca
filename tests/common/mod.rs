#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

use cattery_admin::{
    config::{CacheBackendKind, Config, DatabaseConfig},
    database::Database,
    errors::TranslationResult,
    models::{CatCreateRequest, Gender},
    storage::MediaStorage,
    translation::{
        MemoryCacheBackend, ProviderUsage, TranslationCache, TranslationProvider,
        TranslationService,
    },
    web::AppState,
};

/// Services on an in-memory database with a temporary media directory
pub struct TestApp {
    pub state: AppState,
    pub media_dir: TempDir,
}

pub fn test_config(media_dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.database = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(1),
    };
    config.storage.media_path = media_dir.path().to_path_buf();
    config.web.base_url = "http://cattery.test".to_string();
    config.translation.cache_backend = CacheBackendKind::Memory;
    config.logs.batch_size = 2;
    config
}

pub async fn spawn_app(provider: Option<Arc<dyn TranslationProvider>>) -> TestApp {
    let media_dir = tempfile::tempdir().unwrap();
    let config = Arc::new(test_config(&media_dir));

    let database = Database::new(&config.database).await.unwrap();
    database.migrate().await.unwrap();

    let storage = MediaStorage::new(config.storage.media_path.clone());
    storage.ensure_storage_dirs().await.unwrap();

    let cache = TranslationCache::from_config(Arc::new(MemoryCacheBackend::new()), &config.translation);
    let translation = TranslationService::new(cache, provider);

    TestApp {
        state: AppState::new(database, config, storage, translation),
        media_dir,
    }
}

pub fn cat_request(name: &str, gender: Gender) -> CatCreateRequest {
    CatCreateRequest {
        name: name.to_string(),
        description: None,
        main_image: None,
        images: Vec::new(),
        videos: Vec::new(),
        color: Some("blue".to_string()),
        gender,
        year_of_birth: Some(2021),
        breed: Some("British Shorthair".to_string()),
        category: None,
        vaccinated: true,
        microchipped: true,
        castrated: false,
        mother_id: None,
        father_id: None,
        availability: Default::default(),
    }
}

/// A small valid PNG
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let image = image::DynamicImage::ImageRgb8(image::RgbImage::new(width, height));
    let mut buffer = std::io::Cursor::new(Vec::new());
    image.write_to(&mut buffer, image::ImageFormat::Png).unwrap();
    buffer.into_inner()
}

/// Provider that answers `"{target}:{text}"` after an optional delay and
/// counts upstream calls
#[derive(Default)]
pub struct CountingProvider {
    pub calls: AtomicUsize,
    pub delay: Duration,
}

impl CountingProvider {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationProvider for CountingProvider {
    async fn translate(
        &self,
        texts: &[String],
        _source: &str,
        target: &str,
    ) -> TranslationResult<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(texts.iter().map(|t| format!("{}:{}", target, t)).collect())
    }

    async fn usage(&self) -> TranslationResult<ProviderUsage> {
        Ok(ProviderUsage {
            character_count: 42,
            character_limit: 500_000,
        })
    }
}
