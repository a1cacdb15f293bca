//! SeaORM activity log repository implementation
//!
//! Besides plain inserts and filtered listing this repository provides the
//! batched primitives used by the archive/delete operations and the
//! retention housekeeper.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::traits::ConversionUtils;
use crate::entities::{logs, prelude::*};
use crate::errors::RepositoryResult;
use crate::models::{LogEntry, LogQuery};

/// SeaORM-based log entry repository
#[derive(Clone)]
pub struct LogEntrySeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl LogEntrySeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn insert(&self, entry: &LogEntry) -> RepositoryResult<LogEntry> {
        let details = entry
            .details
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let active_model = logs::ActiveModel {
            id: Set(entry.id),
            timestamp: Set(entry.timestamp),
            level: Set(entry.level.to_string()),
            message: Set(entry.message.clone()),
            action_type: Set(entry.action_type.clone()),
            cat_id: Set(entry.cat_id),
            user_id: Set(entry.user_id.clone()),
            user_email: Set(entry.user_email.clone()),
            archived: Set(entry.archived),
            archived_at: Set(entry.archived_at),
            details: Set(details),
        };

        let model = active_model.insert(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<LogEntry>> {
        let model = Logs::find_by_id(*id).one(&*self.connection).await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Filtered listing, newest first
    pub async fn list(&self, query: &LogQuery) -> RepositoryResult<(Vec<LogEntry>, u64)> {
        let (page, per_page) = ConversionUtils::page_params(query.page, query.limit);

        let mut select = Logs::find();
        if let Some(level) = query.level {
            select = select.filter(logs::Column::Level.eq(level.as_ref()));
        }
        if let Some(action_type) = query.action_type.as_deref().filter(|a| !a.is_empty()) {
            select = select.filter(logs::Column::ActionType.eq(action_type));
        }
        if let Some(cat_id) = query.cat_id {
            select = select.filter(logs::Column::CatId.eq(cat_id));
        }
        if let Some(archived) = query.archived {
            select = select.filter(logs::Column::Archived.eq(archived));
        }
        if let Some(from) = query.from {
            select = select.filter(logs::Column::Timestamp.gte(from));
        }
        if let Some(to) = query.to {
            select = select.filter(logs::Column::Timestamp.lte(to));
        }

        let paginator = select
            .order_by_desc(logs::Column::Timestamp)
            .paginate(&*self.connection, per_page as u64);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page((page - 1) as u64).await?;

        let items = models
            .into_iter()
            .map(Self::model_to_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok((items, total))
    }

    /// Number of non-archived entries older than `cutoff`
    pub async fn count_archivable(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        Ok(Self::archivable(cutoff).count(&*self.connection).await?)
    }

    /// Mark up to `limit` non-archived entries older than `cutoff` as archived
    pub async fn archive_batch(
        &self,
        cutoff: DateTime<Utc>,
        limit: u64,
        archived_at: DateTime<Utc>,
    ) -> RepositoryResult<u64> {
        let ids = Self::ids_of(Self::archivable(cutoff), limit, &self.connection).await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Logs::update_many()
            .col_expr(logs::Column::Archived, Expr::value(true))
            .col_expr(logs::Column::ArchivedAt, Expr::value(Some(archived_at)))
            .filter(logs::Column::Id.is_in(ids))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    /// Number of entries older than `cutoff`, optionally archived ones only
    pub async fn count_deletable(
        &self,
        cutoff: DateTime<Utc>,
        archived_only: bool,
    ) -> RepositoryResult<u64> {
        Ok(Self::deletable(cutoff, archived_only)
            .count(&*self.connection)
            .await?)
    }

    /// Delete up to `limit` entries older than `cutoff`
    pub async fn delete_batch(
        &self,
        cutoff: DateTime<Utc>,
        archived_only: bool,
        limit: u64,
    ) -> RepositoryResult<u64> {
        let ids = Self::ids_of(Self::deletable(cutoff, archived_only), limit, &self.connection)
            .await?;
        if ids.is_empty() {
            return Ok(0);
        }

        let result = Logs::delete_many()
            .filter(logs::Column::Id.is_in(ids))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    /// Remove archived entries whose archive timestamp is older than `cutoff`
    pub async fn purge_archived_before(&self, cutoff: DateTime<Utc>) -> RepositoryResult<u64> {
        let result = Logs::delete_many()
            .filter(logs::Column::Archived.eq(true))
            .filter(logs::Column::ArchivedAt.lt(cutoff))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected)
    }

    fn archivable(cutoff: DateTime<Utc>) -> Select<Logs> {
        Logs::find()
            .filter(logs::Column::Archived.eq(false))
            .filter(logs::Column::Timestamp.lt(cutoff))
    }

    fn deletable(cutoff: DateTime<Utc>, archived_only: bool) -> Select<Logs> {
        let select = Logs::find().filter(logs::Column::Timestamp.lt(cutoff));
        if archived_only {
            select.filter(logs::Column::Archived.eq(true))
        } else {
            select
        }
    }

    async fn ids_of(
        select: Select<Logs>,
        limit: u64,
        connection: &DatabaseConnection,
    ) -> RepositoryResult<Vec<Uuid>> {
        Ok(select
            .select_only()
            .column(logs::Column::Id)
            .order_by_asc(logs::Column::Timestamp)
            .limit(limit)
            .into_tuple::<Uuid>()
            .all(connection)
            .await?)
    }

    fn model_to_domain(model: logs::Model) -> RepositoryResult<LogEntry> {
        let details = model
            .details
            .as_deref()
            .map(serde_json::from_str)
            .transpose()?;

        Ok(LogEntry {
            id: model.id,
            timestamp: model.timestamp,
            level: ConversionUtils::parse_enum("level", &model.level)?,
            message: model.message,
            action_type: model.action_type,
            cat_id: model.cat_id,
            user_id: model.user_id,
            user_email: model.user_email,
            archived: model.archived,
            archived_at: model.archived_at,
            details,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::models::LogLevel;
    use chrono::Duration;

    async fn create_test_repo() -> LogEntrySeaOrmRepository {
        let database = Database::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();
        LogEntrySeaOrmRepository::new(database.connection())
    }

    fn entry(age_days: i64) -> LogEntry {
        LogEntry {
            id: Uuid::new_v4(),
            timestamp: Utc::now() - Duration::days(age_days),
            level: LogLevel::Info,
            message: format!("{age_days} days old"),
            action_type: "cat_updated".to_string(),
            cat_id: None,
            user_id: None,
            user_email: None,
            archived: false,
            archived_at: None,
            details: Some(serde_json::json!({"age": age_days})),
        }
    }

    #[tokio::test]
    async fn test_archive_batches_only_old_entries() {
        let repo = create_test_repo().await;
        for age in [1, 40, 50, 60] {
            repo.insert(&entry(age)).await.unwrap();
        }

        let cutoff = Utc::now() - Duration::days(30);
        assert_eq!(repo.count_archivable(cutoff).await.unwrap(), 3);

        let now = Utc::now();
        assert_eq!(repo.archive_batch(cutoff, 2, now).await.unwrap(), 2);
        assert_eq!(repo.count_archivable(cutoff).await.unwrap(), 1);
        assert_eq!(repo.archive_batch(cutoff, 2, now).await.unwrap(), 1);
        assert_eq!(repo.archive_batch(cutoff, 2, now).await.unwrap(), 0);

        let (archived, total) = repo
            .list(&LogQuery {
                archived: Some(true),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(total, 3);
        assert!(archived.iter().all(|e| e.archived_at.is_some()));
        assert_eq!(archived[0].details, Some(serde_json::json!({"age": 40})));
    }

    #[tokio::test]
    async fn test_delete_and_purge() {
        let repo = create_test_repo().await;
        let mut old_archived = entry(100);
        old_archived.archived = true;
        old_archived.archived_at = Some(Utc::now() - Duration::days(95));
        let mut recent_archived = entry(100);
        recent_archived.archived = true;
        recent_archived.archived_at = Some(Utc::now() - Duration::days(5));
        let old_live = entry(100);

        for e in [&old_archived, &recent_archived, &old_live] {
            repo.insert(e).await.unwrap();
        }

        let purged = repo
            .purge_archived_before(Utc::now() - Duration::days(90))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(repo.find_by_id(&old_archived.id).await.unwrap().is_none());

        let cutoff = Utc::now() - Duration::days(30);
        assert_eq!(repo.count_deletable(cutoff, true).await.unwrap(), 1);
        assert_eq!(repo.count_deletable(cutoff, false).await.unwrap(), 2);
        assert_eq!(repo.delete_batch(cutoff, false, 10).await.unwrap(), 2);
    }
}
