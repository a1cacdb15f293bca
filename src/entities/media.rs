use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "media")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub url: String,
    /// Path relative to the media storage root, absent for external items
    pub path: Option<String>,
    pub media_type: String,
    pub cat_id: Option<Uuid>,
    pub size: i64,
    pub mime_type: Option<String>,
    pub file_hash: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub locked: bool,
    pub lock_reason: Option<String>,
    pub deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub deleted_by: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::cats::Entity",
        from = "Column::CatId",
        to = "super::cats::Column::Id"
    )]
    Cat,
}

impl Related<super::cats::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cat.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
