use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "cats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub main_image: Option<String>,
    /// JSON encoded array of image URLs
    pub images: String,
    /// JSON encoded array of video URLs
    pub videos: String,
    pub color: Option<String>,
    pub gender: String,
    pub year_of_birth: Option<i32>,
    pub breed: Option<String>,
    pub category: Option<String>,
    pub vaccinated: bool,
    pub microchipped: bool,
    pub castrated: bool,
    pub mother_id: Option<Uuid>,
    pub father_id: Option<Uuid>,
    pub availability: String,
    pub deleted: bool,
    pub deleted_at: Option<DateTimeUtc>,
    pub views: i64,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::media::Entity")]
    Media,
}

impl Related<super::media::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Media.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
