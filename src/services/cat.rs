//! Cat profile service
//!
//! Business rules on top of the cat repository: partial updates, the soft
//! delete lifecycle and parentage validation.

use chrono::{Datelike, Utc};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::database::repositories::{CatSeaOrmRepository, traits::ConversionUtils};
use crate::errors::{AppError, AppResult};
use crate::models::{
    ActionType, CatCreateRequest, CatListQuery, CatProfile, CatUpdateRequest, Gender, LogLevel,
    NewLogEntry, PaginatedResponse,
};
use crate::services::ActivityLogger;

/// Oldest plausible year of birth
const MIN_YEAR_OF_BIRTH: i32 = 1990;

#[derive(Clone)]
pub struct CatService {
    repo: CatSeaOrmRepository,
    activity: ActivityLogger,
}

impl CatService {
    pub fn new(repo: CatSeaOrmRepository, activity: ActivityLogger) -> Self {
        Self { repo, activity }
    }

    pub async fn create(
        &self,
        request: CatCreateRequest,
        actor: Option<String>,
    ) -> AppResult<CatProfile> {
        let name = Self::validate_name(&request.name)?;
        Self::validate_year_of_birth(request.year_of_birth)?;

        let id = Uuid::new_v4();
        self.validate_parent(id, request.mother_id, Gender::Female)
            .await?;
        self.validate_parent(id, request.father_id, Gender::Male)
            .await?;

        let now = Utc::now();
        let profile = CatProfile {
            id,
            name,
            description: request.description,
            main_image: request.main_image,
            images: request.images,
            videos: request.videos,
            color: request.color,
            gender: request.gender,
            year_of_birth: request.year_of_birth,
            breed: request.breed,
            category: Self::normalize_category(request.category),
            vaccinated: request.vaccinated,
            microchipped: request.microchipped,
            castrated: request.castrated,
            mother_id: request.mother_id,
            father_id: request.father_id,
            availability: request.availability,
            deleted: false,
            deleted_at: None,
            views: 0,
            created_at: now,
            updated_at: now,
        };

        let created = self.repo.insert(&profile).await?;
        info!(cat_id = %created.id, "Created cat profile '{}'", created.name);

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::CatCreated,
                    format!("Created cat '{}'", created.name),
                )
                .with_cat(Some(created.id))
                .with_user(actor),
            )
            .await;

        Ok(created)
    }

    /// Fetch a profile; soft-deleted profiles are hidden unless asked for
    pub async fn get(&self, id: &Uuid, include_deleted: bool) -> AppResult<CatProfile> {
        match self.repo.find_by_id(id).await? {
            Some(cat) if include_deleted || !cat.deleted => Ok(cat),
            _ => Err(AppError::not_found("Cat", id)),
        }
    }

    pub async fn list(&self, query: &CatListQuery) -> AppResult<PaginatedResponse<CatProfile>> {
        let (page, per_page) = ConversionUtils::page_params(query.page, query.limit);
        let (items, total) = self.repo.list(query).await?;
        Ok(PaginatedResponse::new(items, total, page, per_page))
    }

    /// Apply a partial update to a non-deleted profile
    pub async fn update(
        &self,
        id: &Uuid,
        request: CatUpdateRequest,
        actor: Option<String>,
    ) -> AppResult<CatProfile> {
        let mut cat = self.get(id, false).await?;

        if let Some(name) = request.name {
            cat.name = Self::validate_name(&name)?;
        }
        if let Some(description) = request.description {
            cat.description = description;
        }
        if let Some(main_image) = request.main_image {
            cat.main_image = main_image;
        }
        if let Some(images) = request.images {
            cat.images = images;
        }
        if let Some(videos) = request.videos {
            cat.videos = videos;
        }
        if let Some(color) = request.color {
            cat.color = color;
        }
        if let Some(year_of_birth) = request.year_of_birth {
            Self::validate_year_of_birth(year_of_birth)?;
            cat.year_of_birth = year_of_birth;
        }
        if let Some(breed) = request.breed {
            cat.breed = breed;
        }
        if let Some(category) = request.category {
            cat.category = Self::normalize_category(category);
        }
        if let Some(vaccinated) = request.vaccinated {
            cat.vaccinated = vaccinated;
        }
        if let Some(microchipped) = request.microchipped {
            cat.microchipped = microchipped;
        }
        if let Some(castrated) = request.castrated {
            cat.castrated = castrated;
        }
        if let Some(availability) = request.availability {
            cat.availability = availability;
        }
        if let Some(mother_id) = request.mother_id {
            self.validate_parent(cat.id, mother_id, Gender::Female).await?;
            cat.mother_id = mother_id;
        }
        if let Some(father_id) = request.father_id {
            self.validate_parent(cat.id, father_id, Gender::Male).await?;
            cat.father_id = father_id;
        }
        if let Some(gender) = request.gender {
            if gender != cat.gender {
                self.validate_gender_change(&cat, gender).await?;
            }
            cat.gender = gender;
        }

        cat.updated_at = Utc::now();
        let updated = self.repo.save(&cat).await?;
        debug!(cat_id = %updated.id, "Updated cat profile");

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::CatUpdated,
                    format!("Updated cat '{}'", updated.name),
                )
                .with_cat(Some(updated.id))
                .with_user(actor),
            )
            .await;

        Ok(updated)
    }

    /// Move a profile to the trash. Already trashed profiles are returned as-is.
    pub async fn soft_delete(&self, id: &Uuid, actor: Option<String>) -> AppResult<CatProfile> {
        let mut cat = self.get(id, true).await?;
        if cat.deleted {
            return Ok(cat);
        }

        let now = Utc::now();
        cat.deleted = true;
        cat.deleted_at = Some(now);
        cat.updated_at = now;
        let cat = self.repo.save(&cat).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::CatDeleted,
                    format!("Moved cat '{}' to trash", cat.name),
                )
                .with_cat(Some(cat.id))
                .with_user(actor),
            )
            .await;

        Ok(cat)
    }

    pub async fn restore(&self, id: &Uuid, actor: Option<String>) -> AppResult<CatProfile> {
        let mut cat = self.get(id, true).await?;
        if !cat.deleted {
            return Err(AppError::validation(format!(
                "Cat {} is not in the trash",
                id
            )));
        }

        cat.deleted = false;
        cat.deleted_at = None;
        cat.updated_at = Utc::now();
        let cat = self.repo.save(&cat).await?;

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Info,
                    ActionType::CatRestored,
                    format!("Restored cat '{}'", cat.name),
                )
                .with_cat(Some(cat.id))
                .with_user(actor),
            )
            .await;

        Ok(cat)
    }

    /// Remove a trashed profile for good and detach it from its children
    pub async fn permanent_delete(&self, id: &Uuid, actor: Option<String>) -> AppResult<()> {
        let cat = self.get(id, true).await?;
        if !cat.deleted {
            return Err(AppError::validation(format!(
                "Cat {} must be moved to the trash before it can be deleted permanently",
                id
            )));
        }

        let detached = self.repo.clear_parent_references(id).await?;
        self.repo.delete(id).await?;
        info!(cat_id = %id, detached_children = detached, "Permanently deleted cat profile");

        self.activity
            .record(
                NewLogEntry::new(
                    LogLevel::Warn,
                    ActionType::CatPurged,
                    format!("Permanently deleted cat '{}'", cat.name),
                )
                .with_cat(Some(cat.id))
                .with_user(actor)
                .with_details(json!({ "detached_children": detached })),
            )
            .await;

        Ok(())
    }

    pub async fn record_view(&self, id: &Uuid) -> AppResult<()> {
        if self.repo.increment_views(id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("Cat", id))
        }
    }

    pub async fn children_of(&self, id: &Uuid) -> AppResult<Vec<CatProfile>> {
        self.get(id, true).await?;
        Ok(self.repo.find_children(id).await?)
    }

    /// Drop `url` from every profile that references it; returns profiles changed
    pub async fn detach_media_url(&self, url: &str) -> AppResult<u64> {
        let mut changed = 0;
        for mut cat in self.repo.find_referencing_media(url).await? {
            if cat.remove_media_url(url) {
                cat.updated_at = Utc::now();
                self.repo.save(&cat).await?;
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Owner of a media item must exist and not be trashed
    pub async fn ensure_exists(&self, id: &Uuid) -> AppResult<()> {
        self.get(id, false).await.map(|_| ())
    }

    fn validate_name(name: &str) -> AppResult<String> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(AppError::validation("Cat name must not be empty"));
        }
        Ok(trimmed.to_string())
    }

    fn validate_year_of_birth(year: Option<i32>) -> AppResult<()> {
        if let Some(year) = year {
            let current = Utc::now().year();
            if !(MIN_YEAR_OF_BIRTH..=current).contains(&year) {
                return Err(AppError::validation(format!(
                    "Year of birth must be between {} and {}",
                    MIN_YEAR_OF_BIRTH, current
                )));
            }
        }
        Ok(())
    }

    fn normalize_category(category: Option<String>) -> Option<String> {
        category
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }

    /// A parent must be another existing, non-deleted cat of the expected gender
    async fn validate_parent(
        &self,
        child_id: Uuid,
        parent_id: Option<Uuid>,
        expected: Gender,
    ) -> AppResult<()> {
        let Some(parent_id) = parent_id else {
            return Ok(());
        };
        let role = match expected {
            Gender::Female => "Mother",
            Gender::Male => "Father",
        };

        if parent_id == child_id {
            return Err(AppError::validation(format!(
                "{role} cannot be the cat itself"
            )));
        }

        let parent = self
            .repo
            .find_by_id(&parent_id)
            .await?
            .filter(|p| !p.deleted)
            .ok_or_else(|| AppError::validation(format!("{role} {parent_id} does not exist")))?;

        if parent.gender != expected {
            return Err(AppError::validation(format!(
                "{role} '{}' must be {}",
                parent.name, expected
            )));
        }
        Ok(())
    }

    /// A cat cannot change gender while recorded as a parent in the old role
    async fn validate_gender_change(&self, cat: &CatProfile, new_gender: Gender) -> AppResult<()> {
        let conflicting = self
            .repo
            .find_children(&cat.id)
            .await?
            .into_iter()
            .filter(|child| match new_gender {
                Gender::Male => child.mother_id == Some(cat.id),
                Gender::Female => child.father_id == Some(cat.id),
            })
            .count();

        if conflicting > 0 {
            return Err(AppError::validation(format!(
                "Cannot change gender of '{}': recorded as parent of {} cat(s)",
                cat.name, conflicting
            )));
        }
        Ok(())
    }
}
