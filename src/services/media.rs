//! Media registry service
//!
//! Items move `active -> trashed -> purged`, with `trashed -> active` on
//! restore. The `locked` flag is orthogonal to that lifecycle and blocks the
//! purge step in every state.

use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::repositories::{MediaSeaOrmRepository, traits::ConversionUtils};
use crate::errors::{AppError, AppResult, StorageError};
use crate::models::{
    ActionType, EmptyTrashResult, LogLevel, MediaItem, MediaListQuery, MediaStats, MediaUpload,
    NewLogEntry, PaginatedResponse, RegisterExternalMediaRequest,
};
use crate::services::{ActivityLogger, CatService};
use crate::storage::MediaStorage;

#[derive(Clone)]
pub struct MediaService {
    repo: MediaSeaOrmRepository,
    cats: CatService,
    storage: MediaStorage,
    activity: ActivityLogger,
    config: Arc<Config>,
}

impl MediaService {
    pub fn new(
        repo: MediaSeaOrmRepository,
        cats: CatService,
        storage: MediaStorage,
        activity: ActivityLogger,
        config: Arc<Config>,
    ) -> Self {
        Self {
            repo,
            cats,
            storage,
            activity,
            config,
        }
    }

    /// Store an uploaded file and register it.
    ///
    /// Content identical to an active item owned by the same cat is not
    /// stored twice; the existing item is returned instead.
    pub async fn upload(&self, upload: MediaUpload) -> AppResult<MediaItem> {
        let name = upload.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Media name must not be empty"));
        }
        let max_size = self.config.web.max_upload_bytes;
        if upload.data.len() > max_size {
            return Err(StorageError::TooLarge {
                size: upload.data.len(),
                max_size,
            }
            .into());
        }
        if let Some(cat_id) = &upload.cat_id {
            self.cats.ensure_exists(cat_id).await?;
        }

        // Reject unsupported content before touching the filesystem
        MediaStorage::detect_type(&upload.data)?;

        let file_hash = MediaStorage::hash(&upload.data);
        if let Some(existing) = self
            .repo
            .find_by_hash(&file_hash, upload.cat_id)
            .await?
        {
            debug!(media_id = %existing.id, "Upload matches existing media content");
            return Ok(existing);
        }

        let id = Uuid::new_v4();
        let stored = self.storage.save(&upload.data, id).await?;
        let now = Utc::now();
        let item = MediaItem {
            id,
            name: name.to_string(),
            url: self.config.media_url(&id),
            path: Some(stored.relative_path),
            media_type: stored.media_type,
            cat_id: upload.cat_id,
            size: stored.size,
            mime_type: Some(stored.mime_type),
            file_hash: Some(stored.file_hash),
            width: stored.dimensions.map(|(w, _)| w as i32),
            height: stored.dimensions.map(|(_, h)| h as i32),
            locked: false,
            lock_reason: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            created_at: now,
            updated_at: now,
        };

        let item = match self.repo.insert(&item).await {
            Ok(item) => item,
            Err(e) => {
                if let Some(path) = &item.path {
                    if let Err(cleanup) = self.storage.delete(path).await {
                        warn!(media_id = %id, "Failed to remove orphaned upload: {}", cleanup);
                    }
                }
                return Err(e.into());
            }
        };
        info!(media_id = %item.id, size = item.size, "Uploaded media '{}'", item.name);

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::MediaUploaded,
                    format!("Uploaded {} '{}'", item.media_type, item.name),
                )
                .with_cat(item.cat_id)
                .with_user(upload.uploaded_by)
                .with_details(json!({ "media_id": item.id, "size": item.size })),
            )
            .await;

        Ok(item)
    }

    /// Register a URL-only item with no stored file
    pub async fn register_external(
        &self,
        request: RegisterExternalMediaRequest,
        actor: Option<String>,
    ) -> AppResult<MediaItem> {
        let name = request.name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Media name must not be empty"));
        }
        let url = url::Url::parse(&request.url)
            .map_err(|e| AppError::validation(format!("Invalid media URL '{}': {}", request.url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::validation(format!(
                "Media URL must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if let Some(cat_id) = &request.cat_id {
            self.cats.ensure_exists(cat_id).await?;
        }

        let now = Utc::now();
        let item = MediaItem {
            id: Uuid::new_v4(),
            name: name.to_string(),
            url: url.to_string(),
            path: None,
            media_type: request.media_type,
            cat_id: request.cat_id,
            size: 0,
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
        };
        let item = self.repo.insert(&item).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::MediaRegistered,
                    format!("Registered external {} '{}'", item.media_type, item.name),
                )
                .with_cat(item.cat_id)
                .with_user(actor)
                .with_details(json!({ "media_id": item.id, "url": item.url })),
            )
            .await;

        Ok(item)
    }

    pub async fn get(&self, id: &Uuid) -> AppResult<MediaItem> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found("Media", id))
    }

    pub async fn list_active(
        &self,
        query: &MediaListQuery,
    ) -> AppResult<PaginatedResponse<MediaItem>> {
        self.list(query, false).await
    }

    pub async fn list_trash(&self, query: &MediaListQuery) -> AppResult<PaginatedResponse<MediaItem>> {
        self.list(query, true).await
    }

    async fn list(
        &self,
        query: &MediaListQuery,
        deleted: bool,
    ) -> AppResult<PaginatedResponse<MediaItem>> {
        let (page, per_page) = ConversionUtils::page_params(query.page, query.limit);
        let (items, total) = self.repo.list(query, deleted).await?;
        Ok(PaginatedResponse::new(items, total, page, per_page))
    }

    /// Move an item to the trash; already trashed items are returned unchanged
    pub async fn soft_delete(&self, id: &Uuid, actor: Option<String>) -> AppResult<MediaItem> {
        let mut item = self.get(id).await?;
        if item.deleted {
            return Ok(item);
        }

        let now = Utc::now();
        item.deleted = true;
        item.deleted_at = Some(now);
        item.deleted_by = actor.clone();
        item.updated_at = now;
        let item = self.repo.save(&item).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::MediaTrashed,
                    format!("Moved '{}' to trash", item.name),
                )
                .with_cat(item.cat_id)
                .with_user(actor)
                .with_details(json!({ "media_id": item.id })),
            )
            .await;

        Ok(item)
    }

    pub async fn restore(&self, id: &Uuid, actor: Option<String>) -> AppResult<MediaItem> {
        let mut item = self.get(id).await?;
        if !item.deleted {
            return Err(AppError::validation(format!(
                "Media {} is not in the trash",
                id
            )));
        }

        item.deleted = false;
        item.deleted_at = None;
        item.deleted_by = None;
        item.updated_at = Utc::now();
        let item = self.repo.save(&item).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::MediaRestored,
                    format!("Restored '{}' from trash", item.name),
                )
                .with_cat(item.cat_id)
                .with_user(actor)
                .with_details(json!({ "media_id": item.id })),
            )
            .await;

        Ok(item)
    }

    pub async fn lock(
        &self,
        id: &Uuid,
        reason: Option<String>,
        actor: Option<String>,
    ) -> AppResult<MediaItem> {
        let mut item = self.get(id).await?;
        item.locked = true;
        item.lock_reason = reason.filter(|r| !r.trim().is_empty());
        item.updated_at = Utc::now();
        let item = self.repo.save(&item).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::MediaLocked,
                    format!("Locked '{}'", item.name),
                )
                .with_cat(item.cat_id)
                .with_user(actor)
                .with_details(json!({ "media_id": item.id, "reason": item.lock_reason })),
            )
            .await;

        Ok(item)
    }

    pub async fn unlock(&self, id: &Uuid, actor: Option<String>) -> AppResult<MediaItem> {
        let mut item = self.get(id).await?;
        item.locked = false;
        item.lock_reason = None;
        item.updated_at = Utc::now();
        let item = self.repo.save(&item).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::MediaUnlocked,
                    format!("Unlocked '{}'", item.name),
                )
                .with_cat(item.cat_id)
                .with_user(actor)
                .with_details(json!({ "media_id": item.id })),
            )
            .await;

        Ok(item)
    }

    /// Purge an item for good. Locked items are rejected whatever their trash state.
    pub async fn permanent_delete(&self, id: &Uuid, actor: Option<String>) -> AppResult<()> {
        let item = self.get(id).await?;
        self.purge(&item).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Warn,
                    ActionType::MediaPurged,
                    format!("Permanently deleted '{}'", item.name),
                )
                .with_cat(item.cat_id)
                .with_user(actor)
                .with_details(json!({ "media_id": item.id, "url": item.url })),
            )
            .await;

        Ok(())
    }

    /// Purge every trashed item that is not locked
    pub async fn empty_trash(&self, actor: Option<String>) -> AppResult<EmptyTrashResult> {
        let mut result = EmptyTrashResult::default();

        for item in self.repo.list_all_trashed().await? {
            if item.locked {
                result.skipped_locked += 1;
                continue;
            }
            match self.purge(&item).await {
                Ok(()) => result.purged += 1,
                Err(AppError::MediaLocked { .. }) => result.skipped_locked += 1,
                Err(e) => {
                    warn!(media_id = %item.id, "Failed to purge trashed media: {}", e);
                    result.failed += 1;
                }
            }
        }

        info!(
            purged = result.purged,
            skipped_locked = result.skipped_locked,
            failed = result.failed,
            "Emptied media trash"
        );

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Warn,
                    ActionType::TrashEmptied,
                    format!("Emptied trash: {} item(s) purged", result.purged),
                )
                .with_user(actor)
                .with_details(json!({
                    "purged": result.purged,
                    "skipped_locked": result.skipped_locked,
                    "failed": result.failed,
                })),
            )
            .await;

        Ok(result)
    }

    pub async fn stats(&self) -> AppResult<MediaStats> {
        Ok(self.repo.stats().await?)
    }

    /// Stored bytes of an uploaded item
    pub async fn read_file(&self, id: &Uuid) -> AppResult<(MediaItem, Vec<u8>)> {
        let item = self.get(id).await?;
        let path = item
            .path
            .clone()
            .ok_or_else(|| AppError::not_found("Media file", id))?;

        match self.storage.read(&path).await {
            Ok(data) => Ok((item, data)),
            Err(StorageError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::not_found("Media file", id))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove the record, then its file. The lock is checked again by the
    /// delete itself so a lock taken after `item` was read still wins.
    async fn purge(&self, item: &MediaItem) -> AppResult<()> {
        if item.locked {
            return Err(Self::locked_error(item));
        }

        if !self.repo.delete_unlocked(&item.id).await? {
            return match self.repo.find_by_id(&item.id).await? {
                Some(current) if current.locked => Err(Self::locked_error(&current)),
                Some(_) => Err(AppError::internal(format!(
                    "Media {} could not be deleted",
                    item.id
                ))),
                None => Err(AppError::not_found("Media", item.id)),
            };
        }

        if let Some(path) = &item.path {
            if let Err(e) = self.storage.delete(path).await {
                warn!(media_id = %item.id, "Failed to remove purged media file: {}", e);
            }
        }
        let detached = self.cats.detach_media_url(&item.url).await?;
        debug!(media_id = %item.id, detached_from = detached, "Purged media");
        Ok(())
    }

    fn locked_error(item: &MediaItem) -> AppError {
        AppError::MediaLocked {
            id: item.id.to_string(),
            reason: item
                .lock_reason
                .clone()
                .unwrap_or_else(|| "no reason given".to_string()),
        }
    }
}
