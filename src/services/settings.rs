use tracing::info;

use crate::database::repositories::SettingsSeaOrmRepository;
use crate::errors::AppResult;
use crate::models::{ActionType, LogLevel, NewLogEntry, SeoSettings};
use crate::services::ActivityLogger;

const SEO_SETTINGS_KEY: &str = "seo";

#[derive(Clone)]
pub struct SettingsService {
    repo: SettingsSeaOrmRepository,
    activity: ActivityLogger,
}

impl SettingsService {
    pub fn new(repo: SettingsSeaOrmRepository, activity: ActivityLogger) -> Self {
        Self { repo, activity }
    }

    /// Stored SEO settings, or the defaults when none have been saved
    pub async fn get_seo(&self) -> AppResult<SeoSettings> {
        Ok(self
            .repo
            .get::<SeoSettings>(SEO_SETTINGS_KEY)
            .await?
            .unwrap_or_default())
    }

    pub async fn update_seo(
        &self,
        settings: SeoSettings,
        actor: Option<String>,
    ) -> AppResult<SeoSettings> {
        self.repo.put(SEO_SETTINGS_KEY, &settings).await?;
        info!("Updated SEO settings");

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::SettingsUpdated,
                    "Updated SEO settings",
                )
                .with_user(actor),
            )
            .await;

        Ok(settings)
    }
}
