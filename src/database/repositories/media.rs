//! SeaORM media registry repository implementation

use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Select, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::traits::ConversionUtils;
use crate::entities::{media, prelude::*};
use crate::errors::RepositoryResult;
use crate::models::{MediaItem, MediaListQuery, MediaStats};

/// SeaORM-based media repository
#[derive(Clone)]
pub struct MediaSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

#[derive(Debug, FromQueryResult)]
struct SizeTotal {
    total: Option<i64>,
}

impl MediaSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn insert(&self, item: &MediaItem) -> RepositoryResult<MediaItem> {
        let model = Self::to_active_model(item).insert(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<MediaItem>> {
        let model = Media::find_by_id(*id).one(&*self.connection).await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// Persist every field of an existing item
    pub async fn save(&self, item: &MediaItem) -> RepositoryResult<MediaItem> {
        let model = Self::to_active_model(item).update(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    /// Delete the item only if it is not locked at the moment of deletion.
    /// Returns false when nothing was deleted (missing or locked).
    pub async fn delete_unlocked(&self, id: &Uuid) -> RepositoryResult<bool> {
        let result = Media::delete_many()
            .filter(media::Column::Id.eq(*id))
            .filter(media::Column::Locked.eq(false))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// List items with the given deleted flag, newest first
    pub async fn list(
        &self,
        query: &MediaListQuery,
        deleted: bool,
    ) -> RepositoryResult<(Vec<MediaItem>, u64)> {
        let (page, per_page) = ConversionUtils::page_params(query.page, query.limit);

        let paginator = Self::apply_filters(Media::find(), query)
            .filter(media::Column::Deleted.eq(deleted))
            .order_by_desc(media::Column::CreatedAt)
            .paginate(&*self.connection, per_page as u64);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page((page - 1) as u64).await?;

        let items = models
            .into_iter()
            .map(Self::model_to_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok((items, total))
    }

    /// Every trashed item, used when emptying the trash
    pub async fn list_all_trashed(&self) -> RepositoryResult<Vec<MediaItem>> {
        let models = Media::find()
            .filter(media::Column::Deleted.eq(true))
            .order_by_asc(media::Column::DeletedAt)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Items owned by a cat, regardless of lifecycle state
    pub async fn find_by_cat(&self, cat_id: &Uuid) -> RepositoryResult<Vec<MediaItem>> {
        let models = Media::find()
            .filter(media::Column::CatId.eq(*cat_id))
            .order_by_desc(media::Column::CreatedAt)
            .all(&*self.connection)
            .await?;
        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Active item with the same content hash owned by `cat_id`
    /// (unassigned items when `cat_id` is `None`)
    pub async fn find_by_hash(
        &self,
        file_hash: &str,
        cat_id: Option<Uuid>,
    ) -> RepositoryResult<Option<MediaItem>> {
        let owner = match cat_id {
            Some(cat_id) => media::Column::CatId.eq(cat_id),
            None => media::Column::CatId.is_null(),
        };
        let model = Media::find()
            .filter(media::Column::FileHash.eq(file_hash))
            .filter(media::Column::Deleted.eq(false))
            .filter(owner)
            .order_by_asc(media::Column::CreatedAt)
            .one(&*self.connection)
            .await?;
        model.map(Self::model_to_domain).transpose()
    }

    pub async fn stats(&self) -> RepositoryResult<MediaStats> {
        let active = Media::find()
            .filter(media::Column::Deleted.eq(false))
            .count(&*self.connection)
            .await?;
        let trashed = Media::find()
            .filter(media::Column::Deleted.eq(true))
            .count(&*self.connection)
            .await?;
        let locked = Media::find()
            .filter(media::Column::Locked.eq(true))
            .count(&*self.connection)
            .await?;
        let total_bytes = Media::find()
            .select_only()
            .column_as(
                media::Column::Size.sum().cast_as(Alias::new("BIGINT")),
                "total",
            )
            .into_model::<SizeTotal>()
            .one(&*self.connection)
            .await?
            .and_then(|row| row.total)
            .unwrap_or(0);

        Ok(MediaStats {
            active,
            trashed,
            locked,
            total_bytes,
        })
    }

    fn apply_filters(mut select: Select<Media>, query: &MediaListQuery) -> Select<Media> {
        if let Some(cat_id) = query.cat_id {
            select = select.filter(media::Column::CatId.eq(cat_id));
        }
        if let Some(media_type) = query.media_type {
            select = select.filter(media::Column::MediaType.eq(media_type.as_ref()));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(media::Column::Name)))
                    .like(format!("%{}%", search.trim().to_lowercase())),
            );
        }
        select
    }

    fn to_active_model(item: &MediaItem) -> media::ActiveModel {
        media::ActiveModel {
            id: Set(item.id),
            name: Set(item.name.clone()),
            url: Set(item.url.clone()),
            path: Set(item.path.clone()),
            media_type: Set(item.media_type.to_string()),
            cat_id: Set(item.cat_id),
            size: Set(item.size),
            mime_type: Set(item.mime_type.clone()),
            file_hash: Set(item.file_hash.clone()),
            width: Set(item.width),
            height: Set(item.height),
            locked: Set(item.locked),
            lock_reason: Set(item.lock_reason.clone()),
            deleted: Set(item.deleted),
            deleted_at: Set(item.deleted_at),
            deleted_by: Set(item.deleted_by.clone()),
            created_at: Set(item.created_at),
            updated_at: Set(item.updated_at),
        }
    }

    fn model_to_domain(model: media::Model) -> RepositoryResult<MediaItem> {
        Ok(MediaItem {
            id: model.id,
            name: model.name,
            url: model.url,
            path: model.path,
            media_type: ConversionUtils::parse_enum("media_type", &model.media_type)?,
            cat_id: model.cat_id,
            size: model.size,
            mime_type: model.mime_type,
            file_hash: model.file_hash,
            width: model.width,
            height: model.height,
            locked: model.locked,
            lock_reason: model.lock_reason,
            deleted: model.deleted,
            deleted_at: model.deleted_at,
            deleted_by: model.deleted_by,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DatabaseConfig;
    use crate::database::Database;
    use crate::models::MediaType;
    use chrono::Utc;

    async fn create_test_repo() -> MediaSeaOrmRepository {
        let database = Database::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: Some(1),
        })
        .await
        .unwrap();
        database.migrate().await.unwrap();
        MediaSeaOrmRepository::new(database.connection())
    }

    fn item(name: &str, media_type: MediaType, size: i64) -> MediaItem {
        let now = Utc::now();
        MediaItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: format!("https://cdn.example/{name}"),
            path: None,
            media_type,
            cat_id: None,
            size,
            mime_type: None,
            file_hash: None,
            width: None,
            height: None,
            locked: false,
            lock_reason: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_list_splits_active_and_trash() {
        let repo = create_test_repo().await;
        let photo = item("photo.jpg", MediaType::Image, 100);
        let mut clip = item("clip.mp4", MediaType::Video, 900);
        clip.deleted = true;
        clip.deleted_at = Some(Utc::now());
        repo.insert(&photo).await.unwrap();
        repo.insert(&clip).await.unwrap();

        let (active, active_total) = repo.list(&MediaListQuery::default(), false).await.unwrap();
        let (trash, trash_total) = repo.list(&MediaListQuery::default(), true).await.unwrap();
        assert_eq!((active_total, trash_total), (1, 1));
        assert_eq!(active[0].id, photo.id);
        assert_eq!(trash[0].id, clip.id);

        let (videos, _) = repo
            .list(
                &MediaListQuery {
                    media_type: Some(MediaType::Video),
                    ..Default::default()
                },
                false,
            )
            .await
            .unwrap();
        assert!(videos.is_empty());
    }

    #[tokio::test]
    async fn test_stats_counts_and_sums() {
        let repo = create_test_repo().await;
        assert_eq!(repo.stats().await.unwrap(), MediaStats::default());

        let mut locked = item("a.jpg", MediaType::Image, 10);
        locked.locked = true;
        let mut trashed = item("b.jpg", MediaType::Image, 5);
        trashed.deleted = true;
        repo.insert(&locked).await.unwrap();
        repo.insert(&trashed).await.unwrap();

        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.active, 1);
        assert_eq!(stats.trashed, 1);
        assert_eq!(stats.locked, 1);
        assert_eq!(stats.total_bytes, 15);
    }

    #[tokio::test]
    async fn test_find_by_hash_is_scoped_to_owner() {
        let repo = create_test_repo().await;
        let (cat_a, cat_b) = (Uuid::new_v4(), Uuid::new_v4());
        let mut owned_by_a = item("a.png", MediaType::Image, 10);
        owned_by_a.cat_id = Some(cat_a);
        owned_by_a.file_hash = Some("abc".to_string());
        repo.insert(&owned_by_a).await.unwrap();

        let found = repo.find_by_hash("abc", Some(cat_a)).await.unwrap().unwrap();
        assert_eq!(found.id, owned_by_a.id);
        assert!(repo.find_by_hash("abc", Some(cat_b)).await.unwrap().is_none());
        assert!(repo.find_by_hash("abc", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_unlocked_leaves_locked_rows() {
        let repo = create_test_repo().await;
        let mut locked = item("keep.jpg", MediaType::Image, 10);
        locked.locked = true;
        let free = item("drop.jpg", MediaType::Image, 10);
        repo.insert(&locked).await.unwrap();
        repo.insert(&free).await.unwrap();

        assert!(!repo.delete_unlocked(&locked.id).await.unwrap());
        assert!(repo.find_by_id(&locked.id).await.unwrap().is_some());
        assert!(repo.delete_unlocked(&free.id).await.unwrap());
        assert!(repo.find_by_id(&free.id).await.unwrap().is_none());
        assert!(!repo.delete_unlocked(&free.id).await.unwrap());
    }
}
