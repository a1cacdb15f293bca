//! SeaORM Cat profile repository implementation

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use super::traits::ConversionUtils;
use crate::entities::{cats, prelude::*};
use crate::errors::RepositoryResult;
use crate::models::{CatListQuery, CatProfile};

/// SeaORM-based cat profile repository
#[derive(Clone)]
pub struct CatSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl CatSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    /// Insert a fully populated profile
    pub async fn insert(&self, profile: &CatProfile) -> RepositoryResult<CatProfile> {
        let active_model = Self::to_active_model(profile)?;
        let model = active_model.insert(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    /// Find a profile by id regardless of its deleted flag
    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<CatProfile>> {
        let model = Cats::find_by_id(*id).one(&*self.connection).await?;
        model.map(Self::model_to_domain).transpose()
    }

    /// List profiles newest first, returning the page and the total match count
    pub async fn list(&self, query: &CatListQuery) -> RepositoryResult<(Vec<CatProfile>, u64)> {
        let (page, per_page) = ConversionUtils::page_params(query.page, query.limit);

        let mut select = Cats::find();
        if !query.include_deleted {
            select = select.filter(cats::Column::Deleted.eq(false));
        }
        if let Some(availability) = query.availability {
            select = select.filter(cats::Column::Availability.eq(availability.as_ref()));
        }
        if let Some(gender) = query.gender {
            select = select.filter(cats::Column::Gender.eq(gender.as_ref()));
        }
        if let Some(category) = query.category.as_deref().filter(|c| !c.trim().is_empty()) {
            select = select.filter(cats::Column::Category.eq(category.trim().to_lowercase()));
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.trim().is_empty()) {
            select = select.filter(
                Expr::expr(Func::lower(Expr::col(cats::Column::Name)))
                    .like(format!("%{}%", search.trim().to_lowercase())),
            );
        }

        let paginator = select
            .order_by_desc(cats::Column::CreatedAt)
            .paginate(&*self.connection, per_page as u64);
        let total = paginator.num_items().await?;
        let models = paginator.fetch_page((page - 1) as u64).await?;

        let items = models
            .into_iter()
            .map(Self::model_to_domain)
            .collect::<RepositoryResult<Vec<_>>>()?;
        Ok((items, total))
    }

    /// Persist every field of an existing profile
    pub async fn save(&self, profile: &CatProfile) -> RepositoryResult<CatProfile> {
        let active_model = Self::to_active_model(profile)?;
        let model = active_model.update(&*self.connection).await?;
        Self::model_to_domain(model)
    }

    /// Remove the row; returns whether anything was deleted
    pub async fn delete(&self, id: &Uuid) -> RepositoryResult<bool> {
        let result = Cats::delete_by_id(*id).exec(&*self.connection).await?;
        Ok(result.rows_affected > 0)
    }

    /// Atomically increment the view counter of a non-deleted profile
    pub async fn increment_views(&self, id: &Uuid) -> RepositoryResult<bool> {
        let result = Cats::update_many()
            .col_expr(
                cats::Column::Views,
                Expr::col(cats::Column::Views).add(1),
            )
            .filter(cats::Column::Id.eq(*id))
            .filter(cats::Column::Deleted.eq(false))
            .exec(&*self.connection)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Profiles whose mother or father is `parent_id`
    pub async fn find_children(&self, parent_id: &Uuid) -> RepositoryResult<Vec<CatProfile>> {
        let models = Cats::find()
            .filter(
                Condition::any()
                    .add(cats::Column::MotherId.eq(*parent_id))
                    .add(cats::Column::FatherId.eq(*parent_id)),
            )
            .filter(cats::Column::Deleted.eq(false))
            .order_by_asc(cats::Column::Name)
            .all(&*self.connection)
            .await?;

        models.into_iter().map(Self::model_to_domain).collect()
    }

    /// Null out mother/father references to `parent_id`, returning rows touched
    pub async fn clear_parent_references(&self, parent_id: &Uuid) -> RepositoryResult<u64> {
        let now = Utc::now();
        let mothers = Cats::update_many()
            .col_expr(cats::Column::MotherId, Expr::value(Option::<Uuid>::None))
            .col_expr(cats::Column::UpdatedAt, Expr::value(now))
            .filter(cats::Column::MotherId.eq(*parent_id))
            .exec(&*self.connection)
            .await?;
        let fathers = Cats::update_many()
            .col_expr(cats::Column::FatherId, Expr::value(Option::<Uuid>::None))
            .col_expr(cats::Column::UpdatedAt, Expr::value(now))
            .filter(cats::Column::FatherId.eq(*parent_id))
            .exec(&*self.connection)
            .await?;
        Ok(mothers.rows_affected + fathers.rows_affected)
    }

    /// Profiles (deleted or not) that reference `url` in any media field
    pub async fn find_referencing_media(&self, url: &str) -> RepositoryResult<Vec<CatProfile>> {
        let quoted = serde_json::to_string(url)?;
        let models = Cats::find()
            .filter(
                Condition::any()
                    .add(cats::Column::MainImage.eq(url))
                    .add(cats::Column::Images.contains(&quoted))
                    .add(cats::Column::Videos.contains(&quoted)),
            )
            .all(&*self.connection)
            .await?;

        // LIKE may over-match on wildcard characters in the URL
        Ok(models
            .into_iter()
            .map(Self::model_to_domain)
            .collect::<RepositoryResult<Vec<_>>>()?
            .into_iter()
            .filter(|cat| cat.references_media(url))
            .collect())
    }

    fn to_active_model(profile: &CatProfile) -> RepositoryResult<cats::ActiveModel> {
        Ok(cats::ActiveModel {
            id: Set(profile.id),
            name: Set(profile.name.clone()),
            description: Set(profile.description.clone()),
            main_image: Set(profile.main_image.clone()),
            images: Set(ConversionUtils::encode_string_list(&profile.images)?),
            videos: Set(ConversionUtils::encode_string_list(&profile.videos)?),
            color: Set(profile.color.clone()),
            gender: Set(profile.gender.to_string()),
            year_of_birth: Set(profile.year_of_birth),
            breed: Set(profile.breed.clone()),
            category: Set(profile.category.clone()),
            vaccinated: Set(profile.vaccinated),
            microchipped: Set(profile.microchipped),
            castrated: Set(profile.castrated),
            mother_id: Set(profile.mother_id),
            father_id: Set(profile.father_id),
            availability: Set(profile.availability.to_string()),
            deleted: Set(profile.deleted),
            deleted_at: Set(profile.deleted_at),
            views: Set(profile.views),
            created_at: Set(profile.created_at),
            updated_at: Set(profile.updated_at),
        })
    }

    fn model_to_domain(model: cats::Model) -> RepositoryResult<CatProfile> {
        Ok(CatProfile {
            id: model.id,
            name: model.name,
            description: model.description,
            main_image: model.main_image,
            images: ConversionUtils::parse_string_list(&model.images)?,
            videos: ConversionUtils::parse_string_list(&model.videos)?,
            color: model.color,
            gender: ConversionUtils::parse_enum("gender", &model.gender)?,
            year_of_birth: model.year_of_birth,
            breed: model.breed,
            category: model.category,
            vaccinated: model.vaccinated,
            microchipped: model.microchipped,
            castrated: model.castrated,
            mother_id: model.mother_id,
            father_id: model.father_id,
            availability: ConversionUtils::parse_enum("availability", &model.availability)?,
            deleted: model.deleted,
            deleted_at: model.deleted_at,
            views: model.views,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
