//! SeaORM key/value settings repository

use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::entities::{prelude::*, settings};
use crate::errors::RepositoryResult;

/// Settings are stored as JSON documents keyed by name
#[derive(Clone)]
pub struct SettingsSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl SettingsSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Load and decode a settings document, `None` when absent
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> RepositoryResult<Option<T>> {
        let model = Settings::find_by_id(key.to_string())
            .one(&*self.connection)
            .await?;

        match model {
            Some(m) => Ok(Some(serde_json::from_str(&m.value)?)),
            None => Ok(None),
        }
    }

    /// Insert or replace a settings document
    pub async fn put<T: Serialize>(&self, key: &str, value: &T) -> RepositoryResult<()> {
        let active_model = settings::ActiveModel {
            key: Set(key.to_string()),
            value: Set(serde_json::to_string(value)?),
            updated_at: Set(chrono::Utc::now()),
        };

        Settings::insert(active_model)
            .on_conflict(
                OnConflict::column(settings::Column::Key)
                    .update_columns([settings::Column::Value, settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&*self.connection)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::models::SeoSettings;

    #[tokio::test]
    async fn test_put_replaces_existing_document() {
        let database = Database::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();
        let repo = SettingsSeaOrmRepository::new(database.connection());

        assert!(repo.get::<SeoSettings>("seo").await.unwrap().is_none());

        let mut seo = SeoSettings::default();
        repo.put("seo", &seo).await.unwrap();
        seo.site_title = "Northern Lights Cattery".to_string();
        seo.keywords = vec!["maine coon".to_string()];
        repo.put("seo", &seo).await.unwrap();

        let stored: SeoSettings = repo.get("seo").await.unwrap().unwrap();
        assert_eq!(stored, seo);
    }
}
